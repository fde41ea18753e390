use std::{fs, io::Write, sync::Arc};

use clap::Parser;
use log::info;
use ptfc::{Args, Compiler, Config, Error, MemoryRegistry};

fn main() -> Result<(), Error> {
    env_logger::builder()
        .format(|buf, record| {
            let ts = buf.timestamp_micros();
            let style = buf.default_level_style(record.level());
            writeln!(
                buf,
                "{}: {:?}: {style}{}{style:#}: {}",
                ts,
                std::thread::current().id(),
                record.level(),
                record.args()
            )
        })
        .init();

    let config = Config::new(Args::parse())?;
    let args = &config.args;
    let compiler = Compiler::new(config.loader())?;
    let registry = Arc::new(MemoryRegistry::default());
    let font_name = args.family.as_deref().unwrap_or(&args.template);
    let mut font = compiler.create_font(font_name, &args.template, registry.clone())?;

    if let Some(text) = &args.subset {
        font.subset(text, false, None)?;
    }
    match config.params.clone() {
        Some(params) => font.change_params(params)?,
        None => font.reset()?,
    }

    let binary = if args.export {
        font.export(args.family.as_deref(), args.style.as_deref())?
    } else {
        registry.face(font.font_name()).ok_or(Error::NoFont)?
    };
    fs::write(&args.output, &binary).map_err(|source| Error::FileIo {
        path: args.output.clone(),
        source,
    })?;
    info!("Wrote {} bytes to {:?}", binary.len(), args.output);
    Ok(())
}
