//! Workload points used by the capacity planning sheet.
//!
//! An opportunity lists, for every product level it bought, the number of school
//! reports to produce. The points of a planning step grow with the number of
//! products and levels, and with the square root of the number of school reports.

use std::collections::BTreeMap;

use crate::config::*;
use crate::round_to;

#[derive(Eq, PartialEq, Debug, Clone, Copy)]
pub enum PlanningStep {
    SurveyAdmin,
    ReportProduction,
}

/// The product levels bought by a client. A product level that was not bought
/// is absent; one bought without school reports maps to 0.
#[derive(Eq, PartialEq, Debug, Clone, Default)]
pub struct Opportunity {
    pub name: String,
    pub school_reports: BTreeMap<ProductLevel, u32>,
}

#[derive(Eq, PartialEq, Debug, Clone, Copy, Default)]
pub struct Workload {
    pub products: u32,
    pub levels: u32,
    pub school_reports: u32,
    /// 1 when the teacher feedback survey is part of the opportunity.
    pub fft: u32,
}

impl Workload {
    pub fn from_opportunity(opp: &Opportunity) -> Workload {
        let mut products: Vec<SurveyProduct> = opp.school_reports.keys().map(|pl| pl.product).collect();
        products.sort();
        products.dedup();
        let mut levels: Vec<SchoolLevel> = opp.school_reports.keys().map(|pl| pl.level).collect();
        levels.sort();
        levels.dedup();
        Workload {
            products: products.len() as u32,
            levels: levels.len() as u32,
            school_reports: opp.school_reports.values().sum(),
            fft: u32::from(products.contains(&SurveyProduct::Teacher)),
        }
    }
}

pub fn points(step: PlanningStep, w: &Workload) -> i64 {
    let sr = (w.school_reports as f64).sqrt();
    let products = w.products as f64;
    let fft = w.fft as f64;
    let p = match step {
        PlanningStep::SurveyAdmin => 2.0 * sr * (0.5 * (products - fft) + fft) + 3.0 * fft,
        PlanningStep::ReportProduction => 2.0 + products * w.levels as f64 + sr * (2.0 * fft + 1.0),
    };
    round_to(p, 0) as i64
}
