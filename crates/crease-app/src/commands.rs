// Command handlers: one tournament action per invocation, printed to stdout.

use anyhow::{anyhow, bail, Context, Result};
use tracing::info;

use crease_core::config::Config;
use crease_cricket::{
    Match, MatchKind, ScoreEntry, SqliteStore, StageEvent, Team, Tournament, TournamentConfig,
    TournamentSession, TournamentStore,
};

use crate::cli::Command;

/// How many fixtures `status` previews.
const STATUS_PREVIEW: usize = 4;

pub fn run(command: Command, config: &Config, store: SqliteStore) -> Result<()> {
    match command {
        Command::Init {
            name,
            matches_per_pair,
            force,
        } => init(config, store, name, matches_per_pair, force),
        Command::AddTeam { name } => {
            let mut session = open(store)?;
            let team = session.add_team(&name)?;
            println!("Added {} ({})", team.name, team.id);
            Ok(())
        }
        Command::RemoveTeam { team } => {
            let mut session = open(store)?;
            let team_id = resolve_team(session.tournament(), &team)?.id.clone();
            let removed = session.remove_team(&team_id)?;
            println!("Removed {}", removed.name);
            Ok(())
        }
        Command::Start => {
            let mut session = open(store)?;
            session.start()?;
            let t = session.tournament();
            println!(
                "{} is under way: {} league fixtures for {} teams",
                t.name,
                t.matches.len(),
                t.teams.len()
            );
            Ok(())
        }
        Command::Fixtures { all } => {
            let session = open(store)?;
            print_fixtures(session.tournament(), all);
            Ok(())
        }
        Command::Score {
            match_ref,
            team1,
            team2,
            batting_first,
        } => score(store, &match_ref, &team1, &team2, &batting_first),
        Command::SuperOver { match_ref } => {
            let mut session = open(store)?;
            let t = session.tournament();
            let target = resolve_match(t, &match_ref)?;
            // ties chain off the newest link
            let tail = t.chain_tail(&target.id)?.id.clone();
            let sdo = session.create_super_duper_over(&tail)?;
            println!(
                "Super Duper Over #{}: {} v {} ({} overs a side)",
                number(session.tournament(), &sdo),
                sdo.team1.name,
                sdo.team2.name,
                session.tournament().config.super_over_overs
            );
            Ok(())
        }
        Command::Table => {
            let session = open(store)?;
            print_table(session.tournament());
            Ok(())
        }
        Command::Status => {
            let session = open(store)?;
            print_status(session.tournament());
            Ok(())
        }
        Command::Reset => {
            let mut session = open(store)?;
            session.reset()?;
            println!("Tournament reset");
            Ok(())
        }
    }
}

fn init(
    config: &Config,
    store: SqliteStore,
    name: Option<String>,
    matches_per_pair: Option<u32>,
    force: bool,
) -> Result<()> {
    if !force && store.load_tournament()?.is_some() {
        bail!("a tournament already exists; use --force to replace it");
    }
    let mut rules = TournamentConfig::from(config);
    if let Some(p) = matches_per_pair {
        rules.matches_per_team_pair = p;
    }
    let name = name.unwrap_or_else(|| config.tournament.name.clone());
    let session = TournamentSession::create(store, &name, rules)?;
    info!("Initialised tournament {}", session.tournament().id);
    println!("Created {}", session.tournament().name);
    Ok(())
}

fn score(
    store: SqliteStore,
    match_ref: &str,
    team1: &str,
    team2: &str,
    batting_first: &str,
) -> Result<()> {
    let mut session = open(store)?;
    let t = session.tournament();
    let m = resolve_match(t, match_ref)?.clone();
    let batting = resolve_team(t, batting_first)?.id.clone();

    let entry1: ScoreEntry = team1
        .parse()
        .map_err(|e: String| anyhow!(e))
        .with_context(|| format!("bad score for {}", m.team1.name))?;
    let entry2: ScoreEntry = team2
        .parse()
        .map_err(|e: String| anyhow!(e))
        .with_context(|| format!("bad score for {}", m.team2.name))?;

    let outcome = session.submit_score(&m.id, &entry1, &entry2, &batting)?;
    let updated = &outcome.updated;
    if let Some(result) = &updated.result {
        println!(
            "{} {} v {} {}",
            updated.team1.name, result.team1_score, updated.team2.name, result.team2_score
        );
    }
    if let Some(summary) = updated.summary() {
        println!("{summary}");
    }

    let t = session.tournament();
    if updated.is_tied() && updated.kind != MatchKind::League {
        println!("Tied! Run `crease super-over {}` to settle it", number(t, updated));
    }
    for event in &outcome.events {
        match event {
            StageEvent::PlayoffCreated { match_id, .. } => {
                if let Some(m) = t.find_match(match_id) {
                    println!("Next up: {}", describe(t, m));
                }
            }
            StageEvent::PlayoffRejected { kind, reason } => {
                eprintln!("warning: {kind} not created: {reason}");
            }
            StageEvent::StageAdvanced { to, .. } => {
                println!("Stage: {to}");
            }
            StageEvent::TournamentCompleted => {
                println!("Tournament complete");
            }
            StageEvent::SeedsFrozen { .. } => {}
        }
    }
    if let Some(champion) = t.champion() {
        println!("Champion: {}", champion.name);
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Lookups
// ---------------------------------------------------------------------------

fn open(store: SqliteStore) -> Result<TournamentSession<SqliteStore>> {
    TournamentSession::restore(store)?
        .ok_or_else(|| anyhow!("no tournament found; run `crease init` first"))
}

/// A 1-based fixture number or a match id.
fn resolve_match<'a>(t: &'a Tournament, reference: &str) -> Result<&'a Match> {
    if let Ok(n) = reference.trim().parse::<usize>() {
        return n
            .checked_sub(1)
            .and_then(|i| t.matches.get(i))
            .ok_or_else(|| anyhow!("no fixture number {n}"));
    }
    Ok(t.require_match(reference.trim())?)
}

/// A team name (any case) or a team id.
fn resolve_team<'a>(t: &'a Tournament, reference: &str) -> Result<&'a Team> {
    t.team_by_name(reference)
        .or_else(|| t.team(reference.trim()))
        .ok_or_else(|| anyhow!("no team called '{}'", reference.trim()))
}

fn number(t: &Tournament, m: &Match) -> usize {
    t.fixture_number(&m.id).unwrap_or(0)
}

// ---------------------------------------------------------------------------
// Rendering
// ---------------------------------------------------------------------------

fn describe(t: &Tournament, m: &Match) -> String {
    format!(
        "#{:<3} {:<16} {} v {} @ {} {}",
        number(t, m),
        m.kind.to_string(),
        m.team1.name,
        m.team2.name,
        m.venue,
        m.date.format("%a %d %b %H:%M")
    )
}

fn print_fixtures(t: &Tournament, all: bool) {
    if t.matches.is_empty() {
        println!("No fixtures yet; add teams and run `crease start`");
        return;
    }
    for m in &t.matches {
        match m.summary() {
            Some(summary) if all => println!("{}  -> {}", describe(t, m), summary),
            Some(_) => {}
            None => println!("{}", describe(t, m)),
        }
    }
}

fn print_table(t: &Tournament) {
    println!(
        "{:<3} {:<20} {:>3} {:>3} {:>3} {:>3} {:>4} {:>8}  {}",
        "#", "Team", "M", "W", "L", "T", "Pts", "NRR", "Form"
    );
    for (i, row) in t.points_table.iter().enumerate() {
        println!(
            "{:<3} {:<20} {:>3} {:>3} {:>3} {:>3} {:>4} {:>8}  {}",
            i + 1,
            row.team.name,
            row.matches,
            row.wins,
            row.losses,
            row.ties,
            row.points,
            row.nrr_display(),
            row.form()
        );
    }
}

fn print_status(t: &Tournament) {
    println!("{} ({})", t.name, t.id);
    println!("Status: {}   Stage: {}", t.status, t.current_stage);
    println!(
        "Teams: {}   Played: {}/{}",
        t.teams.len(),
        t.completed_matches().len(),
        t.matches.len()
    );
    if let Some(champion) = t.champion() {
        println!("Champion: {}", champion.name);
    }
    let upcoming = t.upcoming_matches();
    if !upcoming.is_empty() {
        println!("Next:");
        for m in upcoming.into_iter().take(STATUS_PREVIEW) {
            println!("  {}", describe(t, m));
        }
    }
}
