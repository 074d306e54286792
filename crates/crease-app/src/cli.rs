use clap::{Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(author, version, about = "Round-robin cricket tournament manager")]
pub struct Cli {
    /// Command
    #[clap(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, Clone, PartialEq)]
#[clap(rename_all = "kebab-case")]
pub enum Command {
    /// Create a new tournament from config/tournament.toml
    Init {
        /// Tournament name (defaults to the configured name)
        #[arg(short, long)]
        name: Option<String>,
        /// League fixtures per pair of teams, 1-5 (defaults to config)
        #[arg(short, long)]
        matches_per_pair: Option<u32>,
        /// Replace an existing tournament
        #[arg(long)]
        force: bool,
    },
    /// Register a team before the tournament starts
    AddTeam { name: String },
    /// Withdraw a team (by name or id) before the tournament starts
    RemoveTeam { team: String },
    /// Generate the league schedule and begin play
    Start,
    /// List fixtures
    Fixtures {
        /// Include matches that already have a result
        #[arg(short, long)]
        all: bool,
    },
    /// Enter or correct a result, e.g. `score 3 150/8/20 140/10/19.2 --batting-first Lions`
    Score {
        /// Fixture number or match id
        #[arg(value_name = "MATCH")]
        match_ref: String,
        /// First-listed team's innings as runs/wickets/overs
        team1: String,
        /// Second-listed team's innings as runs/wickets/overs
        team2: String,
        /// Team (name or id) that batted first
        #[arg(short, long)]
        batting_first: String,
    },
    /// Schedule a Super Duper Over for a tied qualifier or final
    SuperOver {
        /// Fixture number or match id of the tied match
        #[arg(value_name = "MATCH")]
        match_ref: String,
    },
    /// Show the points table
    Table,
    /// Show stage, status and the next fixtures
    Status,
    /// Discard all results and teams and start over
    Reset,
}
