//! Gene-level loss-of-function intolerance (pLI, LOEUF)

use std::collections::HashMap;
use std::path::Path;

use crate::error::UltraError;
use crate::io::{parse_opt_f64, TsvTable};

/// Constraint metrics of one gene
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct GeneConstraint {
    pub pli: Option<f64>,
    pub loeuf: Option<f64>,
}

/// Gene constraint table keyed by gene symbol
#[derive(Debug, Clone, Default)]
pub struct GeneConstraints {
    by_gene: HashMap<String, GeneConstraint>,
}

impl GeneConstraints {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load a table with GENE, pLI and LOEUF columns
    pub fn load(path: &Path) -> Result<Self, UltraError> {
        Self::from_table(&TsvTable::read(path)?)
    }

    pub fn from_table(table: &TsvTable) -> Result<Self, UltraError> {
        let gene = table.require_column("GENE")?;
        let pli = table.require_column("pLI")?;
        let loeuf = table.require_column("LOEUF")?;

        let mut constraints = Self::new();
        for row in table.rows() {
            constraints.insert(
                row.get(gene),
                GeneConstraint {
                    pli: parse_opt_f64(row.get(pli)),
                    loeuf: parse_opt_f64(row.get(loeuf)),
                },
            );
        }
        log::debug!("Loaded constraint metrics for {} genes", constraints.len());
        Ok(constraints)
    }

    pub fn insert(&mut self, gene: impl Into<String>, constraint: GeneConstraint) {
        self.by_gene.insert(gene.into(), constraint);
    }

    /// Metrics for a gene; unknown genes yield all-NA metrics
    pub fn get(&self, gene: &str) -> GeneConstraint {
        self.by_gene.get(gene).copied().unwrap_or_default()
    }

    pub fn len(&self) -> usize {
        self.by_gene.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_gene.is_empty()
    }
}
