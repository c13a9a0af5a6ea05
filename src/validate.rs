// src/validate.rs
//! Batch-level plausibility rules. A batch with any error is never published;
//! warnings are carried along for the log.

use std::collections::{BTreeMap, BTreeSet};

use crate::config::options::ValidationOptions;
use crate::model::{CandidateRecord, ValidatedBatch};

#[derive(Clone, Debug, Default)]
pub struct Validator {
    opts: ValidationOptions,
}

impl Validator {
    pub fn new(opts: ValidationOptions) -> Self {
        Self { opts }
    }

    pub fn validate(&self, world: Option<CandidateRecord>, countries: Vec<CandidateRecord>) -> ValidatedBatch {
        let mut errors = Vec::new();
        let mut warnings = Vec::new();

        self.check_world(world.as_ref(), &mut errors);
        self.check_count(&countries, &mut errors, &mut warnings);
        self.check_critical(&countries, &mut errors, &mut warnings);
        self.check_records(&countries, &mut errors, &mut warnings);
        check_duplicates(&countries, &mut warnings);

        ValidatedBatch { world, countries, errors, warnings }
    }

    fn check_world(&self, world: Option<&CandidateRecord>, errors: &mut Vec<String>) {
        let floor = self.opts.world_population_floor;
        match world.and_then(|w| w.current_population) {
            None => errors.push(s!("world population missing")),
            Some(p) if p <= floor => {
                errors.push(format!("world population {p} is not above {floor}"));
            }
            Some(_) => {}
        }
    }

    fn check_count(&self, countries: &[CandidateRecord], errors: &mut Vec<String>, warnings: &mut Vec<String>) {
        let n = countries.len();
        if n < self.opts.min_countries {
            errors.push(format!("only {n} countries extracted, need at least {}", self.opts.min_countries));
        } else if n < self.opts.expected_countries {
            warnings.push(format!("{n} countries extracted, expected {}", self.opts.expected_countries));
        }
    }

    fn check_critical(&self, countries: &[CandidateRecord], errors: &mut Vec<String>, warnings: &mut Vec<String>) {
        let present: BTreeSet<&str> = countries.iter().filter_map(|c| c.country.as_deref()).collect();
        let missing: Vec<&str> = self
            .opts
            .critical_countries
            .iter()
            .map(String::as_str)
            .filter(|c| !present.contains(c))
            .collect();
        if missing.is_empty() {
            return;
        }
        let msg = format!("critical countries missing: {}", missing.join(", "));
        if self.opts.missing_critical_is_error {
            errors.push(msg);
        } else {
            warnings.push(msg);
        }
    }

    fn check_records(&self, countries: &[CandidateRecord], errors: &mut Vec<String>, warnings: &mut Vec<String>) {
        let violations: Vec<String> = countries.iter().filter_map(|c| self.record_violation(c)).collect();
        if violations.len() > self.opts.max_record_violations {
            errors.push(format!(
                "{} records failed sanity checks (limit {}), e.g. {}",
                violations.len(),
                self.opts.max_record_violations,
                violations[0]
            ));
        } else {
            warnings.extend(violations);
        }
    }

    /// First failed sanity rule for one record, if any. Absent optional
    /// fields are not violations.
    fn record_violation(&self, c: &CandidateRecord) -> Option<String> {
        let name = c.key();
        if !c.current_population.is_some_and(|p| p > 0) {
            return Some(format!("{name}: population {:?} is not positive", c.current_population));
        }
        if let Some(yc) = c.yearly_change
            && yc.abs() >= self.opts.max_abs_yearly_change
        {
            return Some(format!("{name}: yearly change {yc}% out of range"));
        }
        let (lo, hi) = self.opts.med_age_range;
        if let Some(age) = c.med_age
            && !(lo..=hi).contains(&age)
        {
            return Some(format!("{name}: median age {age} outside {lo}..={hi}"));
        }
        None
    }
}

fn check_duplicates(countries: &[CandidateRecord], warnings: &mut Vec<String>) {
    let mut seen: BTreeMap<&str, usize> = BTreeMap::new();
    for c in countries {
        *seen.entry(c.key()).or_default() += 1;
    }
    for (name, n) in seen.into_iter().filter(|(_, n)| *n > 1) {
        warnings.push(format!("duplicate country {name} appears {n} times"));
    }
}
