// Prospect catalog import from CSV.
//
// Expected header: id,first,last,position,school,eligible,slug. Capitalized
// column names as exported from the site's player collection (First, Last,
// Position, School, Eligible, Slug) are accepted too.

use std::io::Read;
use std::path::Path;

use serde::Deserialize;
use tracing::{info, warn};

use whiteboard_core::normalize_position;
use whiteboard_core::player::Player;

#[derive(Debug, thiserror::Error)]
pub enum ImportError {
    #[error("failed to read file {path}: {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },

    #[error("CSV error in {path}: {source}")]
    Csv { path: String, source: csv::Error },
}

/// One CSV row as exported.
#[derive(Debug, Deserialize)]
struct RawPlayerRow {
    #[serde(alias = "Id", alias = "ID")]
    id: String,
    #[serde(alias = "First")]
    first: String,
    #[serde(alias = "Last")]
    last: String,
    #[serde(alias = "Position")]
    position: String,
    #[serde(default, alias = "School")]
    school: String,
    #[serde(alias = "Eligible")]
    eligible: String,
    #[serde(default, alias = "Slug")]
    slug: String,
}

/// Parse players from any reader. Malformed rows and rows without an id or
/// class are skipped with a warning.
pub fn load_players_from_reader<R: Read>(rdr: R) -> Result<Vec<Player>, csv::Error> {
    let mut reader = csv::ReaderBuilder::new().trim(csv::Trim::All).from_reader(rdr);
    let mut players = Vec::new();
    for result in reader.deserialize::<RawPlayerRow>() {
        match result {
            Ok(raw) => {
                if raw.id.is_empty() || raw.eligible.is_empty() {
                    warn!("skipping player row without id or class: {:?}", raw);
                    continue;
                }
                if normalize_position(&raw.position).is_none() {
                    warn!(
                        "player '{}' has position '{}' with no board column",
                        raw.id, raw.position
                    );
                }
                players.push(Player {
                    id: raw.id,
                    first: raw.first,
                    last: raw.last,
                    position: raw.position,
                    school: raw.school,
                    eligible: raw.eligible,
                    slug: raw.slug,
                });
            }
            Err(e) => {
                warn!("skipping malformed player row: {}", e);
            }
        }
    }
    Ok(players)
}

/// Load players from a CSV file on disk.
pub fn load_players(path: &Path) -> Result<Vec<Player>, ImportError> {
    let file = std::fs::File::open(path).map_err(|e| ImportError::Io {
        path: path.display().to_string(),
        source: e,
    })?;
    let players = load_players_from_reader(file).map_err(|e| ImportError::Csv {
        path: path.display().to_string(),
        source: e,
    })?;
    info!("Read {} players from {}", players.len(), path.display());
    Ok(players)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reads_lowercase_header() {
        let csv = "id,first,last,position,school,eligible,slug\n\
                   p1,Cam,Ward,QB,Miami,2026,cam-ward\n";
        let players = load_players_from_reader(csv.as_bytes()).unwrap();
        assert_eq!(players.len(), 1);
        assert_eq!(players[0].display_name(), "C. Ward");
        assert_eq!(players[0].slug, "cam-ward");
    }

    #[test]
    fn reads_site_export_header_and_trims() {
        let csv = "ID,First,Last,Position,School,Eligible,Slug\n\
                   p2 , Travis , Hunter , CB , Colorado , 2026 , travis-hunter\n";
        let players = load_players_from_reader(csv.as_bytes()).unwrap();
        assert_eq!(players[0].id, "p2");
        assert_eq!(players[0].position, "CB");
        assert_eq!(players[0].eligible, "2026");
    }

    #[test]
    fn skips_short_and_blank_rows() {
        let csv = "id,first,last,position,school,eligible,slug\n\
                   p1,Cam,Ward,QB,Miami,2026,cam-ward\n\
                   p2,Only,Three\n\
                   ,No,Id,RB,State,2026,no-id\n\
                   p3,Ashton,Jeanty,RB,Boise State,2026,ashton-jeanty\n";
        let players = load_players_from_reader(csv.as_bytes()).unwrap();
        let ids: Vec<&str> = players.iter().map(|p| p.id.as_str()).collect();
        assert_eq!(ids, vec!["p1", "p3"]);
    }

    #[test]
    fn missing_file_is_io_error() {
        let err = load_players(Path::new("definitely/not/here.csv")).unwrap_err();
        assert!(matches!(err, ImportError::Io { .. }));
    }
}
