//! Garmin MetricMap: vendor summary columns and the canonical catalog.

use senechal_core::{
  metric::{MetricDef, MetricGroup},
  period::PeriodKind,
};

const fn def(metric_id: &'static str, group: MetricGroup, unit: &'static str) -> MetricDef {
  MetricDef { metric_id, group, unit }
}

/// Every metric the Garmin adapter can emit, from either path.
pub static GARMIN_METRICS: &[MetricDef] = &[
  // heart
  def("hr", MetricGroup::Heart, "bpm"),
  def("hr_min", MetricGroup::Heart, "bpm"),
  def("hr_max", MetricGroup::Heart, "bpm"),
  def("rhr", MetricGroup::Heart, "bpm"),
  def("rhr_min", MetricGroup::Heart, "bpm"),
  def("rhr_max", MetricGroup::Heart, "bpm"),
  def("inactive_hr", MetricGroup::Heart, "bpm"),
  // sleep
  def("sleep_total", MetricGroup::Sleep, "minutes"),
  def("sleep_min", MetricGroup::Sleep, "minutes"),
  def("sleep_max", MetricGroup::Sleep, "minutes"),
  def("sleep_deep", MetricGroup::Sleep, "minutes"),
  def("sleep_rem", MetricGroup::Sleep, "minutes"),
  def("sleep_light", MetricGroup::Sleep, "minutes"),
  def("sleep_score", MetricGroup::Sleep, "score"),
  // activity
  def("steps", MetricGroup::Activity, "steps"),
  def("floors", MetricGroup::Activity, "floors"),
  def("intensity_total", MetricGroup::Activity, "minutes"),
  def("intensity_mod", MetricGroup::Activity, "minutes"),
  def("intensity_vig", MetricGroup::Activity, "minutes"),
  // breathing
  def("spo2", MetricGroup::Breathing, "%"),
  def("spo2_min", MetricGroup::Breathing, "%"),
  def("resp_rate", MetricGroup::Breathing, "brpm"),
  def("resp_rate_min", MetricGroup::Breathing, "brpm"),
  def("resp_rate_max", MetricGroup::Breathing, "brpm"),
  // stress and energy
  def("stress", MetricGroup::Stress, "score"),
  def("calories", MetricGroup::Energy, "kcal"),
  def("calories_bmr", MetricGroup::Energy, "kcal"),
  def("calories_active", MetricGroup::Energy, "kcal"),
];

/// Vendor summary column → canonical metric id. Columns not listed here
/// (goals, weight, dates) are ignored.
pub static SUMMARY_COLUMNS: &[(&str, &str)] = &[
  ("hr_avg", "hr"),
  ("hr_min", "hr_min"),
  ("hr_max", "hr_max"),
  ("rhr_avg", "rhr"),
  ("rhr_min", "rhr_min"),
  ("rhr_max", "rhr_max"),
  ("inactive_hr_avg", "inactive_hr"),
  ("sleep_avg", "sleep_total"),
  ("sleep_min", "sleep_min"),
  ("sleep_max", "sleep_max"),
  ("rem_sleep_avg", "sleep_rem"),
  ("steps", "steps"),
  ("floors", "floors"),
  ("intensity_time", "intensity_total"),
  ("moderate_activity_time", "intensity_mod"),
  ("vigorous_activity_time", "intensity_vig"),
  ("spo2_avg", "spo2"),
  ("spo2_min", "spo2_min"),
  ("rr_waking_avg", "resp_rate"),
  ("rr_min", "resp_rate_min"),
  ("rr_max", "resp_rate_max"),
  ("stress_avg", "stress"),
  ("calories_avg", "calories"),
  ("calories_bmr_avg", "calories_bmr"),
  ("calories_active_avg", "calories_active"),
];

pub fn summary_metric(column: &str) -> Option<&'static str> {
  SUMMARY_COLUMNS
    .iter()
    .find(|(c, _)| *c == column)
    .map(|(_, m)| *m)
}

/// A vendor summary table and the column holding its period's first day.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SummaryTable {
  pub name:       &'static str,
  pub date_field: &'static str,
  pub kind:       PeriodKind,
}

pub static SUMMARY_TABLES: &[SummaryTable] = &[
  SummaryTable { name: "days_summary", date_field: "day", kind: PeriodKind::Day },
  SummaryTable { name: "weeks_summary", date_field: "first_day", kind: PeriodKind::Week },
  SummaryTable { name: "months_summary", date_field: "first_day", kind: PeriodKind::Month },
  SummaryTable { name: "years_summary", date_field: "first_day", kind: PeriodKind::Year },
];

pub fn summary_table(kind: PeriodKind) -> &'static SummaryTable {
  match kind {
    PeriodKind::Day => &SUMMARY_TABLES[0],
    PeriodKind::Week => &SUMMARY_TABLES[1],
    PeriodKind::Month => &SUMMARY_TABLES[2],
    PeriodKind::Year => &SUMMARY_TABLES[3],
  }
}

#[cfg(test)]
mod tests {
  use std::collections::BTreeSet;

  use super::*;

  #[test]
  fn every_summary_metric_is_in_the_catalog() {
    let catalog: BTreeSet<&str> = GARMIN_METRICS.iter().map(|d| d.metric_id).collect();
    for (column, metric) in SUMMARY_COLUMNS {
      assert!(catalog.contains(metric), "{column} maps to uncatalogued {metric}");
    }
  }

  #[test]
  fn catalog_ids_are_unique() {
    let ids: BTreeSet<&str> = GARMIN_METRICS.iter().map(|d| d.metric_id).collect();
    assert_eq!(ids.len(), GARMIN_METRICS.len());
  }

  #[test]
  fn goals_and_weight_are_unmapped() {
    for column in ["steps_goal", "floors_goal", "calories_goal", "weight_avg", "day"] {
      assert_eq!(summary_metric(column), None, "{column}");
    }
    assert_eq!(summary_metric("hr_avg"), Some("hr"));
  }

  #[test]
  fn summary_table_per_kind() {
    for kind in [PeriodKind::Day, PeriodKind::Week, PeriodKind::Month, PeriodKind::Year] {
      assert_eq!(summary_table(kind).kind, kind);
    }
    assert_eq!(summary_table(PeriodKind::Day).date_field, "day");
  }
}
