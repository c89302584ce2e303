use std::ops::{AddAssign, Div};

use serde::{Deserialize, Serialize};

use crate::types::History;

pub const TS_GEN_LOSS: &str = "ts_gen_loss";
pub const TS_DIS_LOSS: &str = "ts_dis_loss";
pub const TAB_GEN_LOSS: &str = "tab_gen_loss";
pub const TAB_DIS_LOSS: &str = "tab_dis_loss";
pub const CROSS_LOSS: &str = "cross_loss";

pub const LOSS_NAMES: [&str; 5] = [TS_GEN_LOSS, TS_DIS_LOSS, TAB_GEN_LOSS, TAB_DIS_LOSS, CROSS_LOSS];

/// The five scalar losses of one batch, or their average over an epoch
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct EpochLosses {
    pub ts_gen: f64,
    pub ts_dis: f64,
    pub tab_gen: f64,
    pub tab_dis: f64,
    pub cross: f64,
}

impl EpochLosses {
    fn named(&self) -> [(&'static str, f64); 5] {
        [
            (TS_GEN_LOSS, self.ts_gen),
            (TS_DIS_LOSS, self.ts_dis),
            (TAB_GEN_LOSS, self.tab_gen),
            (TAB_DIS_LOSS, self.tab_dis),
            (CROSS_LOSS, self.cross),
        ]
    }
}

impl AddAssign for EpochLosses {
    fn add_assign(&mut self, rhs: Self) {
        self.ts_gen += rhs.ts_gen;
        self.ts_dis += rhs.ts_dis;
        self.tab_gen += rhs.tab_gen;
        self.tab_dis += rhs.tab_dis;
        self.cross += rhs.cross;
    }
}

impl Div<f64> for EpochLosses {
    type Output = Self;

    fn div(self, rhs: f64) -> Self {
        Self {
            ts_gen: self.ts_gen / rhs,
            ts_dis: self.ts_dis / rhs,
            tab_gen: self.tab_gen / rhs,
            tab_dis: self.tab_dis / rhs,
            cross: self.cross / rhs,
        }
    }
}

/// Per-epoch loss averages of the last training run, keyed by loss name
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TrainingHistory(History);

impl TrainingHistory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, losses: &EpochLosses) {
        for (name, value) in losses.named() {
            self.0.entry(name.to_string()).or_default().push(value);
        }
    }

    pub fn get(&self, name: &str) -> Option<&[f64]> {
        self.0.get(name).map(Vec::as_slice)
    }

    pub fn epochs(&self) -> usize {
        self.0.values().map(Vec::len).max().unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}
