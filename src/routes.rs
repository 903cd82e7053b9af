use indexmap::IndexMap;
use thiserror::Error;
use tracing::warn;

use crate::color::{ColorResolver, ColorWarning, Fill, FillColor};

/// Column headers every route table must carry, in their usual order.
pub const REQUIRED_COLUMNS: [&str; 4] = ["Relais", "Couleur", "Cotation", "Ouvreur"];

/// The table printed when no input is given.
pub const SAMPLE_ROUTES: &str = include_str!("../data/sample_routes.csv");

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("route table is empty")]
    Empty,
    #[error("route table is missing the required columns: {}", .0.join(", "))]
    MissingRequiredField(Vec<String>),
    #[error("line {line}: empty Relais value")]
    MissingRelay { line: u64 },
    #[error("malformed route table: {0}")]
    Csv(#[from] csv::Error),
}

/// One climbing line. Read-only once loaded.
#[derive(Debug, Clone, PartialEq)]
pub struct Route {
    pub relay: String,
    pub grade: String,
    pub setter: String,
    pub fill: Fill,
}

impl Route {
    pub fn new(
        relay: impl Into<String>,
        grade: impl Into<String>,
        setter: impl Into<String>,
        fill: Fill,
    ) -> Self {
        Self {
            relay: relay.into(),
            grade: grade.into(),
            setter: setter.into(),
            fill,
        }
    }

    pub fn colors(&self) -> &[FillColor] {
        self.fill.colors()
    }
}

/// Routes of one relay in table order; that order is the slice order.
#[derive(Debug, Clone, PartialEq)]
pub struct RelayGroup {
    pub relay: String,
    pub routes: Vec<Route>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RowWarning {
    pub line: u64,
    pub warning: ColorWarning,
}

#[derive(Debug, Clone, Default)]
pub struct LoadedRoutes {
    pub groups: Vec<RelayGroup>,
    pub warnings: Vec<RowWarning>,
}

impl LoadedRoutes {
    pub fn route_count(&self) -> usize {
        self.groups.iter().map(|group| group.routes.len()).sum()
    }
}

/// Tab-separated when the text holds any tab (spreadsheet paste), else comma.
pub fn detect_delimiter(text: &str) -> u8 {
    if text.contains('\t') { b'\t' } else { b',' }
}

/// Parses a route table and groups rows by relay in first-seen order.
///
/// Unknown colours do not fail the load: they are painted gray and reported
/// in [`LoadedRoutes::warnings`].
pub fn load_routes(text: &str, resolver: &ColorResolver<'_>) -> Result<LoadedRoutes, LoadError> {
    let text = text.trim_start_matches('\u{feff}');
    if text.trim().is_empty() {
        return Err(LoadError::Empty);
    }

    let mut reader = csv::ReaderBuilder::new()
        .delimiter(detect_delimiter(text))
        .trim(csv::Trim::All)
        .from_reader(text.as_bytes());

    let headers = reader.headers()?.clone();
    let column = |name: &str| headers.iter().position(|header| header == name);
    let (Some(relay_col), Some(color_col), Some(grade_col), Some(setter_col)) = (
        column(REQUIRED_COLUMNS[0]),
        column(REQUIRED_COLUMNS[1]),
        column(REQUIRED_COLUMNS[2]),
        column(REQUIRED_COLUMNS[3]),
    ) else {
        let missing = REQUIRED_COLUMNS
            .iter()
            .filter(|&&name| column(name).is_none())
            .map(ToString::to_string)
            .collect();
        return Err(LoadError::MissingRequiredField(missing));
    };

    let mut groups: IndexMap<String, Vec<Route>> = IndexMap::new();
    let mut warnings = Vec::new();

    for record in reader.records() {
        let record = record?;
        let line = record.position().map_or(0, |pos| pos.line());
        let field = |col: usize| record.get(col).unwrap_or_default();

        let relay = field(relay_col);
        if relay.is_empty() {
            return Err(LoadError::MissingRelay { line });
        }

        let resolution = resolver.resolve(field(color_col));
        for warning in &resolution.warnings {
            warn!(line, token = %warning.token, "unknown route colour, defaulting to gray");
            warnings.push(RowWarning {
                line,
                warning: warning.clone(),
            });
        }

        let route = Route::new(relay, field(grade_col), field(setter_col), resolution.fill());
        groups.entry(relay.to_string()).or_default().push(route);
    }

    Ok(LoadedRoutes {
        groups: groups
            .into_iter()
            .map(|(relay, routes)| RelayGroup { relay, routes })
            .collect(),
        warnings,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::palette::ColorTable;

    fn load(text: &str) -> Result<LoadedRoutes, LoadError> {
        let table = ColorTable::builtin();
        load_routes(text, &ColorResolver::new(&table))
    }

    #[test]
    fn sample_table_groups_by_relay() {
        let loaded = load(SAMPLE_ROUTES).expect("sample loads");
        let relays: Vec<_> = loaded.groups.iter().map(|g| g.relay.as_str()).collect();
        assert_eq!(relays, ["1", "2", "3", "4"]);
        assert_eq!(loaded.route_count(), 14);
        assert!(loaded.warnings.is_empty());

        let first = &loaded.groups[0];
        let grades: Vec<_> = first.routes.iter().map(|r| r.grade.as_str()).collect();
        assert_eq!(grades, ["4b", "6b", "5a+", "6b+"]);
        assert!(first.routes[2].fill.is_gradient());
        assert_eq!(first.routes[0].colors()[0].to_string(), "#0000ff");
    }

    #[test]
    fn groups_follow_first_appearance_not_sort_order() {
        let loaded = load("Relais,Couleur,Cotation,Ouvreur\n10,ROUGE,5a,A\n2,BLEUE,5b,B\n10,NOIRE,6a,C\n")
            .expect("loads");
        let relays: Vec<_> = loaded.groups.iter().map(|g| g.relay.as_str()).collect();
        assert_eq!(relays, ["10", "2"]);
        let setters: Vec<_> = loaded.groups[0].routes.iter().map(|r| r.setter.as_str()).collect();
        assert_eq!(setters, ["A", "C"]);
    }

    #[test]
    fn every_route_lands_in_its_own_relay_group() {
        let loaded = load(
            "Relais,Couleur,Cotation,Ouvreur\n2,ROUGE,5a,A\n1,BLEUE,5b,B\n2,NOIRE,6a,C\n1,VERTE,4c,D\n",
        )
        .expect("loads");
        for group in &loaded.groups {
            assert_eq!(group.routes.len(), 2);
            assert!(group.routes.iter().all(|route| route.relay == group.relay));
        }
    }

    #[test]
    fn tab_separated_paste_is_detected() {
        let loaded = load("Relais\tCouleur\tCotation\tOuvreur\n1\tJAUNE FLUO\t4c\t?\n")
            .expect("loads");
        assert_eq!(detect_delimiter("a\tb"), b'\t');
        assert_eq!(loaded.groups[0].routes[0].colors()[0].to_string(), "#f0ff21");
        assert_eq!(loaded.groups[0].routes[0].setter, "?");
    }

    #[test]
    fn columns_may_come_in_any_order_with_extras() {
        let loaded = load("Ouvreur,Secteur,Cotation,Relais,Couleur\nMAT,Nord,6a,3,VERTE\n")
            .expect("loads");
        let route = &loaded.groups[0].routes[0];
        assert_eq!(route.relay, "3");
        assert_eq!(route.grade, "6a");
        assert_eq!(route.setter, "MAT");
    }

    #[test]
    fn missing_columns_are_listed() {
        let err = load("Relais,Couleur\n1,ROUGE\n").unwrap_err();
        match err {
            LoadError::MissingRequiredField(missing) => {
                assert_eq!(missing, ["Cotation", "Ouvreur"]);
            }
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[test]
    fn unknown_colours_warn_with_line_numbers() {
        let loaded = load("Relais,Couleur,Cotation,Ouvreur\n1,ROUGE,5a,A\n1,CHARTREUSE,5b,B\n")
            .expect("loads");
        assert_eq!(loaded.warnings.len(), 1);
        assert_eq!(loaded.warnings[0].line, 3);
        assert_eq!(loaded.warnings[0].warning.token, "CHARTREUSE");
        assert_eq!(loaded.groups[0].routes[1].colors()[0].to_string(), "#808080");
    }

    #[test]
    fn empty_relay_and_short_rows_are_rejected() {
        assert!(matches!(
            load("Relais,Couleur,Cotation,Ouvreur\n,ROUGE,5a,A\n"),
            Err(LoadError::MissingRelay { line: 2 })
        ));
        assert!(matches!(
            load("Relais,Couleur,Cotation,Ouvreur\n1,ROUGE\n"),
            Err(LoadError::Csv(_))
        ));
        assert!(matches!(load("  \n"), Err(LoadError::Empty)));
    }
}
