//! Command line simulator: reads an AIGER circuit, replays a stimulus file through it and writes
//! the trace.
//!
//! Exit status:
//!   0: simulation ran until the end of the stimulus (or the cycle limit), or help was printed.
//!   1: malformed arguments, unreadable or invalid AIGER file, invalid stimulus, I/O failure.

use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::{Path, PathBuf};
use std::process::exit;

use clap::Parser;

use aigsim::aiger::Aiger;
use aigsim::builder::GraphBuilder;
use aigsim::sim::{SimError, Simulator};
use aigsim::{AigManager, Result};

/// Simulate an AIGER circuit cycle by cycle.
#[derive(Parser, Debug)]
#[command(version, about)]
struct Cli {
    /// Log progress.
    #[arg(short, long)]
    verbose: bool,

    /// Maximum number of simulated cycles.
    #[arg(short, long, default_value_t = 10000, value_parser = clap::value_parser!(u64).range(1..))]
    cycles: u64,

    /// Circuit to simulate, ASCII (`aag`) or binary (`aig`).
    aiger: PathBuf,

    /// Where to write the trace.
    output: PathBuf,

    /// Stimulus file, one line of `0`/`1` per cycle with one character per input.
    input: PathBuf,
}

fn io_error(path: &Path, e: std::io::Error) -> SimError {
    SimError::IoError(format!("{}: {}", path.display(), e))
}

fn simulate(cli: &Cli) -> Result<usize> {
    let aiger = Aiger::from_file(&cli.aiger)?;
    let mut aig = AigManager::new();
    let design = GraphBuilder::new(&aiger, &mut aig).build()?;
    // The flat model is not needed anymore, neither are the gates only it was using.
    drop(aiger);
    let reclaimed = aig.clean();
    log::info!("reclaimed {} nodes, {} left", reclaimed, aig.len());

    let input = File::open(&cli.input).map_err(|e| io_error(&cli.input, e))?;
    let output = File::create(&cli.output).map_err(|e| io_error(&cli.output, e))?;
    let max_cycles = usize::try_from(cli.cycles).unwrap_or(usize::MAX);

    let mut sim = Simulator::new(&mut aig, &design)?;
    sim.run(
        BufReader::new(input),
        BufWriter::new(output),
        Some(max_cycles),
    )
}

fn main() {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) => {
            // Help and version go to stdout and are not failures.
            let code = if e.use_stderr() { 1 } else { 0 };
            let _ = e.print();
            exit(code);
        }
    };

    let default_level = if cli.verbose { "info" } else { "warn" };
    let env = env_logger::Env::default().default_filter_or(default_level);
    let _ = env_logger::Builder::from_env(env).try_init();

    match simulate(&cli) {
        Ok(cycles) => log::info!("done after {} cycles", cycles),
        Err(e) => {
            eprintln!("aigsim: {}", e);
            exit(1);
        }
    }
}

#[cfg(test)]
mod test {
    use std::io::Write;

    use super::*;

    #[test]
    fn cli_test() {
        let cli = Cli::try_parse_from(["aigsim", "-v", "-c", "3", "a.aag", "out", "in"]).unwrap();
        assert!(cli.verbose);
        assert_eq!(cli.cycles, 3);
        assert_eq!(cli.aiger, PathBuf::from("a.aag"));

        let cli = Cli::try_parse_from(["aigsim", "a.aag", "out", "in"]).unwrap();
        assert!(!cli.verbose);
        assert_eq!(cli.cycles, 10000);

        assert!(Cli::try_parse_from(["aigsim", "-c", "0", "a.aag", "out", "in"]).is_err());
        assert!(Cli::try_parse_from(["aigsim", "a.aag", "out"]).is_err());
        let help = Cli::try_parse_from(["aigsim", "-h"]).unwrap_err();
        assert!(!help.use_stderr());
    }

    #[test]
    fn simulate_test() {
        let dir = tempfile::tempdir().unwrap();
        let aiger = dir.path().join("not.aag");
        let input = dir.path().join("stimulus");
        let output = dir.path().join("trace");
        File::create(&aiger)
            .unwrap()
            .write_all(b"aag 1 1 0 1 0\n2\n3\n")
            .unwrap();
        File::create(&input).unwrap().write_all(b"0\n1\n0\n1\n").unwrap();

        let cli = Cli {
            verbose: false,
            cycles: 3,
            aiger,
            output: output.clone(),
            input,
        };
        assert_eq!(simulate(&cli).unwrap(), 3);
        assert_eq!(std::fs::read_to_string(output).unwrap(), "0  1\n1  0\n0  1\n");
    }

    #[test]
    fn missing_files_test() {
        let dir = tempfile::tempdir().unwrap();
        let cli = Cli {
            verbose: false,
            cycles: 1,
            aiger: dir.path().join("missing.aag"),
            output: dir.path().join("trace"),
            input: dir.path().join("stimulus"),
        };
        assert!(simulate(&cli).is_err());
    }
}
