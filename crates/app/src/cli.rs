use clap::{Parser, ValueEnum};

#[derive(Debug, Parser)]
#[command(author, version, about)]
pub struct Cli {
    #[arg(long, default_value = "all")]
    pub mode: Mode,
    /// Wipe and rebuild the search index before the scheduler starts.
    #[arg(long, default_value_t = false)]
    pub rebuild: bool,
    /// Import quotes from a JSON file or http(s) URL, then exit.
    #[arg(long, value_name = "PATH_OR_URL")]
    pub import: Option<String>,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum Mode {
    All,
    Api,
    Worker,
}

impl Mode {
    pub fn run_api(self) -> bool {
        matches!(self, Mode::All | Mode::Api)
    }

    pub fn run_worker(self) -> bool {
        matches!(self, Mode::All | Mode::Worker)
    }
}

#[cfg(test)]
mod tests {
    use clap::Parser;

    use super::{Cli, Mode};

    #[test]
    fn defaults_to_all_modes() {
        let cli = Cli::parse_from(["quottit"]);
        assert!(cli.mode.run_api());
        assert!(cli.mode.run_worker());
        assert!(cli.import.is_none());
    }

    #[test]
    fn parses_import_and_mode() {
        let cli = Cli::parse_from(["quottit", "--mode", "api", "--import", "quotes.json"]);
        assert!(matches!(cli.mode, Mode::Api));
        assert!(!cli.mode.run_worker());
        assert_eq!(cli.import.as_deref(), Some("quotes.json"));
    }
}
