use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};

use crate::languages::ScriptLanguage;

/// Command-line arguments.
#[derive(Parser, Debug)]
#[command(name = "scriptpad")]
#[command(about = "Write and run Kotlin or Swift scripts")]
#[command(version)]
pub(crate) struct Cli {
    /// Log filter (e.g. `debug`, `scriptpad=trace`); overrides RUST_LOG
    #[arg(long, global = true)]
    pub(crate) log_level: Option<String>,

    /// Without a subcommand the editor window is opened.
    #[command(subcommand)]
    pub(crate) command: Option<Command>,
}

#[derive(Subcommand, Debug)]
pub(crate) enum Command {
    /// Run a script in the terminal and list its diagnostics
    Run {
        /// Script to execute
        file: PathBuf,

        /// Language of the script (guessed from the extension if omitted)
        #[arg(long, value_enum)]
        lang: Option<LangArg>,
    },
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum LangArg {
    Kotlin,
    Swift,
}

impl From<LangArg> for ScriptLanguage {
    fn from(lang: LangArg) -> Self {
        match lang {
            LangArg::Kotlin => ScriptLanguage::Kotlin,
            LangArg::Swift => ScriptLanguage::Swift,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn no_arguments_opens_the_window() {
        let cli = Cli::try_parse_from(["scriptpad"]).expect("parse");
        assert!(cli.command.is_none());
        assert!(cli.log_level.is_none());
    }

    #[test]
    fn run_with_language() {
        let cli = Cli::try_parse_from(["scriptpad", "run", "hello.txt", "--lang", "swift", "--log-level", "debug"])
            .expect("parse");
        match cli.command {
            Some(Command::Run { file, lang }) => {
                assert_eq!(file, PathBuf::from("hello.txt"));
                assert_eq!(lang.map(ScriptLanguage::from), Some(ScriptLanguage::Swift));
            }
            other => panic!("unexpected {other:?}"),
        }
        assert_eq!(cli.log_level.as_deref(), Some("debug"));
    }

    #[test]
    fn unknown_language_is_rejected() {
        assert!(Cli::try_parse_from(["scriptpad", "run", "a.kts", "--lang", "java"]).is_err());
    }

    #[test]
    fn cli_definition_is_consistent() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }
}
