use crate::config::toml_config::VoteConfig;
use crate::utils::error::{Result, VoteError};
use clap::{Parser, Subcommand, ValueEnum};

#[derive(Debug, Clone, Parser)]
#[command(name = "boardgame-vote")]
#[command(about = "Nominate, rank and score games for the Eurovision boardgame competition")]
pub struct CliConfig {
    /// Path to TOML configuration file
    #[arg(short, long, default_value = "boardgame-vote.toml")]
    pub config: String,

    /// Override the backend endpoint from the config file
    #[arg(long)]
    pub endpoint: Option<String>,

    /// Override the session file location
    #[arg(long)]
    pub session_path: Option<String>,

    #[arg(short, long, help = "Enable verbose output")]
    pub verbose: bool,

    #[arg(long, help = "Log as JSON lines")]
    pub log_json: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Clone, Subcommand)]
pub enum Command {
    /// Remember who is voting on this machine
    Login {
        #[arg(long)]
        email: String,
        /// Defaults to the email address
        #[arg(long)]
        user_id: Option<String>,
    },
    /// Forget the stored identity
    Logout,
    /// Show the stored identity
    Whoami,
    /// Search the board game catalog by name
    Search {
        name: String,
        /// Zero-based result page
        #[arg(long, default_value_t = 0)]
        page: usize,
    },
    /// Nominate a game (by BGG id) for a category, replacing any earlier pick
    Nominate { category: String, game_id: u64 },
    /// Withdraw your nomination for a category
    Remove { category: String },
    /// List nominations
    Nominations {
        #[arg(long)]
        category: Option<String>,
        /// Only your own nominations
        #[arg(long)]
        mine: bool,
    },
    /// Show and edit your ranking for a category
    Rank {
        category: String,
        /// Move the game at position FROM to position TO (1-based); repeatable
        #[arg(long = "move", num_args = 2, value_names = ["FROM", "TO"], action = clap::ArgAction::Append)]
        moves: Vec<usize>,
        /// Persist the ranking after applying moves
        #[arg(long)]
        save: bool,
    },
    /// Show the leaderboard computed from everyone's rankings
    Leaderboard {
        #[arg(long, value_enum, default_value_t = OutputFormat::Table)]
        format: OutputFormat,
        /// Only show the first N games per category
        #[arg(long)]
        top: Option<usize>,
        /// Mark the points a given voter handed out
        #[arg(long)]
        voter: Option<String>,
        /// Presenter mode: mark the games this person nominated
        #[arg(long, value_name = "EMAIL")]
        highlight: Option<String>,
        /// Keep refreshing until interrupted
        #[arg(long)]
        watch: bool,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Table,
    Csv,
    Json,
}

impl CliConfig {
    /// Command line flags win over the file.
    pub fn apply_overrides(&self, config: &mut VoteConfig) {
        if let Some(endpoint) = &self.endpoint {
            config.backend.endpoint = endpoint.clone();
        }
        if let Some(path) = &self.session_path {
            config.session.path = path.clone();
        }
    }

    /// Pairs `--move FROM TO` values and converts them to zero-based indices.
    pub fn moves(values: &[usize]) -> Result<Vec<(usize, usize)>> {
        if values.len() % 2 != 0 {
            return Err(VoteError::validation("--move takes a FROM and a TO position"));
        }
        values
            .chunks_exact(2)
            .map(|pair| Ok((Self::position(pair[0])?, Self::position(pair[1])?)))
            .collect()
    }

    fn position(one_based: usize) -> Result<usize> {
        one_based.checked_sub(1).ok_or_else(|| {
            VoteError::validation("ranking positions start at 1")
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_rank_moves() {
        let cli = CliConfig::parse_from([
            "boardgame-vote",
            "rank",
            "party game",
            "--move",
            "3",
            "1",
            "--move",
            "2",
            "4",
            "--save",
        ]);
        match cli.command {
            Command::Rank {
                category,
                moves,
                save,
            } => {
                assert_eq!(category, "party game");
                assert_eq!(CliConfig::moves(&moves).unwrap(), vec![(2, 0), (1, 3)]);
                assert!(save);
            }
            other => panic!("unexpected command {:?}", other),
        }
    }

    #[test]
    fn test_overrides() {
        let cli = CliConfig::parse_from([
            "boardgame-vote",
            "--endpoint",
            "https://override.example.com",
            "whoami",
        ]);
        let mut config = VoteConfig::default();
        cli.apply_overrides(&mut config);
        assert_eq!(config.backend.endpoint, "https://override.example.com");
    }

    #[test]
    fn test_move_position_zero_is_rejected() {
        let err = CliConfig::moves(&[0, 3]).unwrap_err();
        assert!(matches!(err, VoteError::ValidationError { .. }));
        assert!(CliConfig::moves(&[2, 0]).is_err());
        assert!(CliConfig::moves(&[1, 2, 3]).is_err());
    }

    #[test]
    fn test_move_requires_both_positions() {
        let parsed = CliConfig::try_parse_from(["boardgame-vote", "rank", "partyGame", "--move", "2"]);
        assert!(parsed.is_err());
    }

    #[test]
    fn test_parse_leaderboard_presenter() {
        let cli = CliConfig::parse_from([
            "boardgame-vote",
            "leaderboard",
            "--highlight",
            "host@x.com",
            "--top",
            "3",
        ]);
        match cli.command {
            Command::Leaderboard {
                highlight, top, voter, ..
            } => {
                assert_eq!(highlight.as_deref(), Some("host@x.com"));
                assert_eq!(top, Some(3));
                assert!(voter.is_none());
            }
            other => panic!("unexpected command {:?}", other),
        }
    }
}
