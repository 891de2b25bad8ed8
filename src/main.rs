use anyhow::Result;
use std::env;
use std::path::PathBuf;

mod config;
mod driver;
mod events;
mod hist;
mod runtime;
mod selection;
mod weights;

use driver::RunArgs;

fn usage() -> ! {
    eprintln!("usage: hist config.json hists.(json|cbor) events1.npz [events2.npz ...]");
    std::process::exit(1);
}

/// `config output input...`; `None` when any of the three is missing.
fn parse_args<I>(args: I) -> Option<RunArgs>
where
    I: IntoIterator,
    I::Item: Into<PathBuf>,
{
    let mut args = args.into_iter().map(Into::<PathBuf>::into);
    let config = args.next()?;
    let output = args.next()?;
    let inputs: Vec<PathBuf> = args.collect();
    if inputs.is_empty() {
        return None;
    }
    Some(RunArgs {
        config,
        output,
        inputs,
    })
}

fn main() -> Result<()> {
    let args = parse_args(env::args_os().skip(1)).unwrap_or_else(|| usage());
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    runtime::configure_thread_pool(args.inputs.len());

    let counts = driver::run(&args)?;
    log::info!(
        "[done] entries={} events={} count={}",
        counts.entries,
        counts.events,
        counts.count
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fewer_than_three_arguments_is_a_usage_error() {
        assert!(parse_args(Vec::<&str>::new()).is_none());
        assert!(parse_args(["conf.json"]).is_none());
        assert!(parse_args(["conf.json", "out.json"]).is_none());
    }

    #[test]
    fn inputs_keep_their_order() {
        let args = parse_args(["conf.json", "out.cbor", "b.npz", "a.npz"]).unwrap();
        assert_eq!(args.config, PathBuf::from("conf.json"));
        assert_eq!(args.output, PathBuf::from("out.cbor"));
        assert_eq!(args.inputs, [PathBuf::from("b.npz"), PathBuf::from("a.npz")]);
    }
}
