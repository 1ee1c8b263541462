mod arg;

use ::std::fs::File;
use ::std::io::Write;
use ::std::process::ExitCode;

use ::clap::Parser;
use ::filterio::config::EngineConfig;
use ::filterio::filter::param::ParamDict;
use ::filterio::filter::param::ParamValue;
use ::filterio::Engine;

use self::arg::Args;

fn decode_hex(s: &str) -> Result<Vec<u8>, String> {
    if s.len() % 2 != 0 {
        return Err("hex key must have an even number of digits".to_string());
    }
    (0..s.len())
        .step_by(2)
        .map(|i| u8::from_str_radix(&s[i..i + 2], 16).map_err(|e| e.to_string()))
        .collect()
}

fn params_for(name: &str, args: &Args) -> Result<ParamDict, String> {
    let mut dict = ParamDict::new();
    match name {
        "RC4Decode" | "AESDecode" => {
            let key_hex = args
                .key
                .as_deref()
                .ok_or_else(|| format!("{name} requires --key"))?;
            dict = dict.with("Key", ParamValue::Bytes(decode_hex(key_hex)?));
        }
        "StreamDecode" => {
            if let Some(length) = args.length {
                dict = dict.with("Length", ParamValue::Int(length));
            }
        }
        _ => {}
    }
    Ok(dict)
}

fn run(args: Args) -> Result<(), String> {
    let mut engine = Engine::new(EngineConfig::default());
    let device = ::filterio::device::FileDevice::open_read(&args.input)
        .map_err(|e| format!("failed to open {:?}: {e}", args.input))?;
    let mut current = engine
        .open_device(Box::new(device), "input", ::filterio::filter::Direction::Input)
        .map_err(|e| e.to_string())?;

    for name in &args.chain {
        let params = params_for(name, &args)?;
        current = engine
            .open(
                name,
                params,
                ::filterio::engine::Source::Filter(current),
                false,
            )
            .map_err(|e| format!("opening {name}: {e}"))?;
        log::info!("opened {name}");
    }

    let decoded = engine.read_all(current).map_err(|e| e.to_string())?;
    log::info!("decoded {} bytes", decoded.len());
    log::debug!("preview: {}", filterio::debug_bytes_preview(&decoded, 64));

    match args.output {
        Some(path) => {
            let mut out = File::create(&path).map_err(|e| format!("creating {path:?}: {e}"))?;
            out.write_all(&decoded).map_err(|e| e.to_string())?;
        }
        None => {
            ::std::io::stdout()
                .write_all(&decoded)
                .map_err(|e| e.to_string())?;
        }
    }
    Ok(())
}

fn main() -> ExitCode {
    let args = Args::parse();
    let level = if args.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();

    match run(args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(message) => {
            log::error!("{message}");
            ExitCode::FAILURE
        }
    }
}
