//! Seat-plan roster: the authoritative list of team names and seat
//! assignments, loaded once at startup from the organizer-maintained CSV.

use std::collections::BTreeMap;
use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};

use serde::Deserialize;

/// One roster entry. Room and desk are free-form and may be empty.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TeamSeat {
    pub team: String,
    pub room: String,
    pub desk: String,
}

#[derive(Debug, Deserialize)]
struct SeatPlanRow {
    #[serde(rename = "Team Name")]
    team: String,
    #[serde(rename = "Room", default)]
    room: String,
    #[serde(rename = "Desk No", default)]
    desk: String,
}

/// In-memory roster keyed by exact team name.
#[derive(Debug, Default, Clone)]
pub struct SeatPlan {
    seats: BTreeMap<String, TeamSeat>,
}

impl SeatPlan {
    pub fn from_path(path: &Path) -> Result<Self, RosterError> {
        let file = File::open(path).map_err(|source| RosterError::Open {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_reader(file)
    }

    pub fn from_reader<R: Read>(reader: R) -> Result<Self, RosterError> {
        let mut csv_reader = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .from_reader(reader);

        let mut seats = BTreeMap::new();
        for row in csv_reader.deserialize::<SeatPlanRow>() {
            let row = row?;
            if row.team.is_empty() {
                continue;
            }
            seats.insert(
                row.team.clone(),
                TeamSeat {
                    team: row.team,
                    room: row.room,
                    desk: row.desk,
                },
            );
        }

        Ok(Self { seats })
    }

    /// Sorted, unique, non-empty team names for the upload form.
    pub fn team_names(&self) -> Vec<String> {
        self.seats.keys().cloned().collect()
    }

    pub fn lookup(&self, team: &str) -> Option<&TeamSeat> {
        self.seats.get(team)
    }

    pub fn len(&self) -> usize {
        self.seats.len()
    }

    pub fn is_empty(&self) -> bool {
        self.seats.is_empty()
    }
}

#[derive(Debug, thiserror::Error)]
pub enum RosterError {
    #[error("unable to open seat plan {path:?}: {source}")]
    Open {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("seat plan is malformed: {0}")]
    Parse(#[from] csv::Error),
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    const SAMPLE: &str = "Room,Desk No,Team Name\n\
        Lab 2,14,Borrow Checkers\n\
        Lab 1,3,Alpha\n\
        Lab 1,4, \n\
        Lab 2,15,Alpha\n";

    #[test]
    fn loads_sorted_unique_team_names() {
        let plan = SeatPlan::from_reader(Cursor::new(SAMPLE)).expect("sample parses");
        assert_eq!(plan.team_names(), vec!["Alpha", "Borrow Checkers"]);
        assert_eq!(plan.len(), 2);
    }

    #[test]
    fn lookup_is_exact_and_keeps_last_assignment() {
        let plan = SeatPlan::from_reader(Cursor::new(SAMPLE)).expect("sample parses");
        let seat = plan.lookup("Alpha").expect("Alpha present");
        assert_eq!(seat.room, "Lab 2");
        assert_eq!(seat.desk, "15");
        assert!(plan.lookup("alpha").is_none());
    }

    #[test]
    fn tolerates_missing_optional_columns() {
        let csv = "Team Name\nGamma\n";
        let plan = SeatPlan::from_reader(Cursor::new(csv)).expect("minimal header parses");
        let seat = plan.lookup("Gamma").expect("Gamma present");
        assert!(seat.room.is_empty());
        assert!(seat.desk.is_empty());
    }

    #[test]
    fn surfaces_csv_shape_errors() {
        let csv = "Room,Desk No,Team Name\nLab 1,3\n";
        let err = SeatPlan::from_reader(Cursor::new(csv)).expect_err("short row rejected");
        assert!(matches!(err, RosterError::Parse(_)));
    }
}
