//! Document kinds and portal selectors.
//!
//! Both spreadsheets live behind near-identical ScriptCase grids; the only
//! behavioral difference is captured in [`DocumentSpec`], so the two flows
//! share one code path in the collector.

use std::path::{Path, PathBuf};

use serde::Deserialize;

/// Year/period select, present on both grids.
pub const YEAR_SELECT: &str = "#SC_data";
/// Category select, only on the contracheque grid.
pub const CATEGORY_SELECT: &str = "#SC_classificacao";
/// Search trigger.
pub const SEARCH_BUTTON: &str = "#sc_b_pesq_bot";
/// Export button group above the result grid.
pub const EXPORT_GROUP_BUTTON: &str = "#sc_btgp_btn_group_1_top";
/// XLS format option inside the export group.
pub const XLS_OPTION: &str = "#xls_top";
/// Final download confirmation.
pub const CONFIRM_DOWNLOAD: &str = "#idBtnDown";

/// Category filter value for the contracheque grid.
pub const CATEGORY_VALUE: &str = "MEMBROS ATIVOS##@@MEMBROS ATIVOS";

/// The two spreadsheets collected per period.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DocumentKind {
    /// Base pay ("contracheque").
    Contracheque,
    /// Indemnity payments ("verbas indenizatórias").
    Indenizatorias,
}

/// Per-kind interaction parameters. Keeping them in one table keeps the two
/// flows from drifting apart.
#[derive(Debug, Clone, Copy)]
pub struct DocumentSpec {
    /// Filename infix, also used in log lines.
    pub label: &'static str,
    pub base_url: &'static str,
    /// The contracheque grid needs the member-category filter set before
    /// searching; the indemnity grid has no such select.
    pub requires_category: bool,
}

impl DocumentKind {
    /// Collection order: contracheque first, then indemnities, matching the
    /// order the downstream parser expects on stdout.
    pub const ALL: [DocumentKind; 2] = [DocumentKind::Contracheque, DocumentKind::Indenizatorias];

    pub fn spec(&self) -> DocumentSpec {
        match self {
            DocumentKind::Contracheque => DocumentSpec {
                label: "contracheque",
                base_url:
                    "https://contrachequetransparencia.mpam.mp.br/grid_VW_TRANSPARENCIA_GERAL/",
                requires_category: true,
            },
            DocumentKind::Indenizatorias => DocumentSpec {
                label: "indenizatorias",
                base_url:
                    "https://contrachequetransparencia.mpam.mp.br/grid_TRANSPARENCIA_INDENIZACAO/",
                requires_category: false,
            },
        }
    }

    /// Parser-expected output path for this kind and period. The prefix is
    /// frozen: the downstream parser matches on it.
    pub fn download_path(&self, output_dir: &Path, month: u32, year: u32) -> PathBuf {
        output_dir.join(format!(
            "membros-ativos-{}-{:02}-{}.xls",
            self.spec().label,
            month,
            year
        ))
    }
}

/// Value the portal expects in the period select, e.g. `01/2024##@@01/2024`.
pub fn period_select_value(month: u32, year: u32) -> String {
    let period = format!("{month:02}/{year}");
    format!("{period}##@@{period}")
}

/// Outcome of a select-set attempt, reported by injected JS. Distinguishes
/// an absent period option (empty result set) from a broken page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SelectOutcome {
    /// Option present, value set, change event dispatched.
    Ok,
    /// Select exists but has no option for the requested value.
    NoOption,
    /// Select element missing from the page.
    NoElement,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_table_covers_both_kinds() {
        assert_eq!(DocumentKind::ALL.len(), 2);
        let specs: Vec<_> = DocumentKind::ALL.iter().map(|k| k.spec()).collect();
        assert_ne!(specs[0].base_url, specs[1].base_url);
        assert!(specs[0].requires_category);
        assert!(!specs[1].requires_category);
    }

    #[test]
    fn test_download_path_pattern() {
        let path = DocumentKind::Contracheque.download_path(Path::new("/tmp/out"), 1, 2024);
        assert_eq!(
            path,
            PathBuf::from("/tmp/out/membros-ativos-contracheque-01-2024.xls")
        );

        let path = DocumentKind::Indenizatorias.download_path(Path::new("/out"), 11, 2023);
        assert_eq!(
            path,
            PathBuf::from("/out/membros-ativos-indenizatorias-11-2023.xls")
        );
    }

    #[test]
    fn test_period_select_value() {
        assert_eq!(period_select_value(1, 2024), "01/2024##@@01/2024");
        assert_eq!(period_select_value(12, 2022), "12/2022##@@12/2022");
    }

    #[test]
    fn test_select_outcome_from_js() {
        let outcome: SelectOutcome = serde_json::from_str("\"no-option\"").unwrap();
        assert_eq!(outcome, SelectOutcome::NoOption);
        let outcome: SelectOutcome = serde_json::from_str("\"ok\"").unwrap();
        assert_eq!(outcome, SelectOutcome::Ok);
    }
}
