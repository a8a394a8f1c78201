//! Per-sheet import configuration.
use crate::import::parse_sheet;
use crate::import::HeaderPolicy;
use crate::import::ImportError;
use crate::import::ParsedSheet;
use crate::spreadsheet::Sheet;

/// Turns one decoded sheet into its parsed form under a header policy.
pub type SheetParser = fn(&Sheet, &HeaderPolicy) -> Result<ParsedSheet, ImportError>;

/// How one configured sheet is imported.
#[derive(Clone, Debug)]
pub struct SheetSpec {
    /// Exact sheet name in the workbook
    pub name: String,
    pub policy: HeaderPolicy,
    pub parser: SheetParser,
}

impl SheetSpec {
    /// A sheet located by its header marker and parsed by [`parse_sheet`].
    pub fn marker(name: &str, marker: &str) -> Self {
        Self {
            name: name.to_owned(),
            policy: HeaderPolicy::marker(marker),
            parser: parse_sheet,
        }
    }
}

/// Which sheets of a workbook are imported.
#[derive(Clone, Debug)]
pub enum SheetSelection {
    /// Exactly these sheets, in this order; each must exist in the workbook.
    Configured(Vec<SheetSpec>),
    /// Every sheet of the workbook in manifest order, all under one policy.
    Every(HeaderPolicy),
}

/// A named import configuration.
#[derive(Clone, Debug)]
pub struct ImportTemplate {
    pub name: String,
    pub sheets: SheetSelection,
}

impl ImportTemplate {
    pub fn new(name: &str, sheets: SheetSelection) -> Self {
        Self {
            name: name.to_owned(),
            sheets,
        }
    }

    /// The SG866 laboratory project workbook: five marker-detected sheets.
    pub fn sg866() -> Self {
        Self::new("sg866", SheetSelection::Configured(vec![
            SheetSpec::marker("Project Master Data", "分类 (Category)"),
            SheetSpec::marker("Milestone Tracker", "里程碑编号"),
            SheetSpec::marker("Sample Tracking", "物料/样品名称"),
            SheetSpec::marker("Execution Details", "Project Stage"),
            SheetSpec::marker("Lead Summary", "Final Candidate ID"),
        ]))
    }

    /// Any workbook: every sheet, header at the first non-empty row.
    pub fn generic() -> Self {
        Self::new("generic", SheetSelection::Every(HeaderPolicy::FirstNonEmpty))
    }

    /// Looks a built-in template up by name.
    pub fn by_name(name: &str) -> Option<Self> {
        match name {
            "sg866" => Some(Self::sg866()),
            "generic" => Some(Self::generic()),
            _ => None,
        }
    }
}
