use std::path::Path;
use std::str::FromStr;

use anyhow::{Context, Result, anyhow};
use chrono::{NaiveDate, Utc};
use rusqlite::{Connection, params};

use crate::record::{MalformedRow, MatchRecord, Surface, Winner};

/// Opens (and if needed creates) the match archive at `path`.
pub fn open_db(path: &Path) -> Result<Connection> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).ok();
    }
    let conn =
        Connection::open(path).with_context(|| format!("open sqlite db {}", path.display()))?;
    init_schema(&conn)?;
    Ok(conn)
}

pub fn init_schema(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        r#"
        PRAGMA journal_mode = WAL;
        CREATE TABLE IF NOT EXISTS matches (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            season TEXT NOT NULL,
            match_date TEXT NOT NULL,
            surface TEXT NOT NULL,
            player_a TEXT NOT NULL,
            player_b TEXT NOT NULL,
            pts_a REAL NOT NULL,
            pts_b REAL NOT NULL,
            a1 INTEGER NOT NULL, a2 INTEGER NOT NULL, a3 INTEGER NOT NULL,
            a4 INTEGER NOT NULL, a5 INTEGER NOT NULL,
            b1 INTEGER NOT NULL, b2 INTEGER NOT NULL, b3 INTEGER NOT NULL,
            b4 INTEGER NOT NULL, b5 INTEGER NOT NULL,
            winner INTEGER NOT NULL,
            odds_a REAL NULL,
            odds_b REAL NULL
        );
        CREATE INDEX IF NOT EXISTS idx_matches_date ON matches(match_date);
        CREATE INDEX IF NOT EXISTS idx_matches_season ON matches(season);

        CREATE TABLE IF NOT EXISTS ingest_runs (
            run_id INTEGER PRIMARY KEY AUTOINCREMENT,
            started_at TEXT NOT NULL,
            finished_at TEXT NULL,
            seasons TEXT NOT NULL,
            rows_inserted INTEGER NOT NULL,
            rows_malformed INTEGER NOT NULL
        );
        "#,
    )
    .context("create sqlite schema")?;
    Ok(())
}

#[derive(Debug, Clone)]
pub struct ArchiveIngestSummary {
    pub seasons: Vec<String>,
    pub rows_inserted: usize,
    pub rows_malformed: usize,
}

/// Replaces one season's rows wholesale, so re-running an ingest is
/// idempotent. Malformed rows are counted but never stored.
pub fn replace_season(
    conn: &mut Connection,
    season: &str,
    rows: &[Result<MatchRecord, MalformedRow>],
) -> Result<(usize, usize)> {
    let tx = conn.transaction().context("begin season transaction")?;
    tx.execute("DELETE FROM matches WHERE season = ?1", params![season])
        .context("clear season rows")?;

    let mut inserted = 0usize;
    let mut malformed = 0usize;
    for row in rows {
        match row {
            Ok(rec) => {
                insert_match(&tx, season, rec)?;
                inserted += 1;
            }
            Err(_) => malformed += 1,
        }
    }
    tx.commit().context("commit season transaction")?;
    Ok((inserted, malformed))
}

pub fn record_ingest_run(conn: &Connection, summary: &ArchiveIngestSummary) -> Result<()> {
    conn.execute(
        "INSERT INTO ingest_runs(started_at, finished_at, seasons, rows_inserted, rows_malformed)
         VALUES (?1, ?2, ?3, ?4, ?5)",
        params![
            Utc::now().to_rfc3339(),
            Utc::now().to_rfc3339(),
            summary.seasons.join(","),
            summary.rows_inserted as i64,
            summary.rows_malformed as i64,
        ],
    )
    .context("insert ingest run")?;
    Ok(())
}

/// Loads every archived match in chronological order. ISO date strings sort
/// correctly as text; the rowid breaks same-day ties by insertion order.
pub fn load_all(conn: &Connection) -> Result<Vec<MatchRecord>> {
    let mut stmt = conn
        .prepare(
            r#"
            SELECT match_date, surface, player_a, player_b, pts_a, pts_b,
                   a1, a2, a3, a4, a5, b1, b2, b3, b4, b5,
                   winner, odds_a, odds_b
            FROM matches
            ORDER BY match_date ASC, id ASC
            "#,
        )
        .context("prepare load matches query")?;

    let rows = stmt
        .query_map([], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, String>(2)?,
                row.get::<_, String>(3)?,
                row.get::<_, f64>(4)?,
                row.get::<_, f64>(5)?,
                [
                    row.get::<_, u16>(6)?,
                    row.get::<_, u16>(7)?,
                    row.get::<_, u16>(8)?,
                    row.get::<_, u16>(9)?,
                    row.get::<_, u16>(10)?,
                ],
                [
                    row.get::<_, u16>(11)?,
                    row.get::<_, u16>(12)?,
                    row.get::<_, u16>(13)?,
                    row.get::<_, u16>(14)?,
                    row.get::<_, u16>(15)?,
                ],
                row.get::<_, i64>(16)?,
                row.get::<_, Option<f64>>(17)?,
                row.get::<_, Option<f64>>(18)?,
            ))
        })
        .context("query archived matches")?;

    let mut out = Vec::new();
    for row in rows {
        let (date, surface, player_a, player_b, pts_a, pts_b, sets_a, sets_b, winner, odds_a, odds_b) =
            row.context("decode match row")?;
        out.push(MatchRecord {
            date: NaiveDate::parse_from_str(&date, "%Y-%m-%d")
                .with_context(|| format!("archived date {date:?} is invalid"))?,
            surface: Surface::from_str(&surface).map_err(|e| anyhow!(e))?,
            player_a,
            player_b,
            pts_a,
            pts_b,
            sets_a,
            sets_b,
            winner: match winner {
                1 => Winner::A,
                2 => Winner::B,
                other => return Err(anyhow!("archived winner flag {other} is invalid")),
            },
            odds_a,
            odds_b,
        });
    }
    Ok(out)
}

fn insert_match(tx: &rusqlite::Transaction<'_>, season: &str, m: &MatchRecord) -> Result<()> {
    tx.execute(
        r#"
        INSERT INTO matches (
            season, match_date, surface, player_a, player_b, pts_a, pts_b,
            a1, a2, a3, a4, a5, b1, b2, b3, b4, b5,
            winner, odds_a, odds_b
        ) VALUES (
            ?1, ?2, ?3, ?4, ?5, ?6, ?7,
            ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16, ?17,
            ?18, ?19, ?20
        )
        "#,
        params![
            season,
            m.date.format("%Y-%m-%d").to_string(),
            m.surface.as_str(),
            m.player_a,
            m.player_b,
            m.pts_a,
            m.pts_b,
            m.sets_a[0],
            m.sets_a[1],
            m.sets_a[2],
            m.sets_a[3],
            m.sets_a[4],
            m.sets_b[0],
            m.sets_b[1],
            m.sets_b[2],
            m.sets_b[3],
            m.sets_b[4],
            i64::from(m.winner.label()),
            m.odds_a,
            m.odds_b,
        ],
    )
    .context("insert match")?;
    Ok(())
}
