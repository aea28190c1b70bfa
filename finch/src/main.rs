use simple_logger::SimpleLogger;

use crate::flags::{Finch, FinchCmd};

mod config;
mod discover;
mod flags;
mod run;
mod util;

pub const CONFIG_FILE: &str = "finch.toml";

pub fn main() {
    let flags = Finch::from_env_or_exit();
    let (verbose, quiet) = match &flags.subcommand {
        FinchCmd::Process(cmd) => (cmd.verbose, cmd.quiet),
        FinchCmd::Sitemap(cmd) => (cmd.verbose, cmd.quiet),
    };

    let level = util::log_level(verbose, quiet);
    if let Err(e) = SimpleLogger::new().with_level(level).env().init() {
        eprintln!("warning: logging unavailable: {e}");
    }

    let code = match flags.subcommand {
        FinchCmd::Process(cmd) => match run::process(&cmd) {
            Ok(summary) => {
                println!("{summary}");
                for failure in &summary.failures {
                    println!("  {failure}");
                }

                if cmd.strict && summary.failed > 0 { 1 } else { 0 }
            }
            Err(e) => {
                println!("error: {e}");
                2
            }
        },
        FinchCmd::Sitemap(cmd) => match run::sitemap(&cmd) {
            Ok(output) => {
                println!("sitemap: {}", output.display());
                0
            }
            Err(e) => {
                println!("error: {e}");
                2
            }
        },
    };

    std::process::exit(code);
}
