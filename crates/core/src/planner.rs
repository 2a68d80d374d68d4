//! Calendar slot scheduling for student study plans.

use std::collections::HashMap;

use chrono::{Datelike, Duration, NaiveDate, NaiveTime, Weekday};
use thiserror::Error;

use crate::model::{PlanConfig, ScheduledSession};

/// Start hours offered on vacation days (morning and afternoon blocks).
const VACATION_HOURS: [u32; 6] = [9, 10, 11, 14, 15, 16];

const SESSION_LENGTH_HOURS: i64 = 1;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum PlannerError {
    #[error("unknown weekday in availability: {0}")]
    InvalidWeekday(String),

    #[error("invalid slot time {0:?}, expected HH:MM")]
    InvalidTime(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Slot {
    date: NaiveDate,
    time: NaiveTime,
}

/// Spreads a plan's subjects over the free hours between today and the last exam.
pub struct ScheduleGenerator<'a> {
    config: &'a PlanConfig,
}

impl<'a> ScheduleGenerator<'a> {
    #[must_use]
    pub fn new(config: &'a PlanConfig) -> Self {
        Self { config }
    }

    /// Generate one-hour sessions from `today` through the latest exam date.
    ///
    /// - No subjects, no exam dates, or a zero total weight yield no sessions.
    /// - Vacation days offer fixed hours; other days use the weekly availability.
    /// - Each subject is owed `round(slots × weight / total_weight)` slots, handed
    ///   out round-robin in config order until slots or quotas run out.
    ///
    /// # Errors
    ///
    /// Returns `PlannerError` if the availability grid holds an unknown weekday
    /// name or a time that is not `HH:MM`.
    pub fn generate(&self, today: NaiveDate) -> Result<Vec<ScheduledSession>, PlannerError> {
        let subjects = &self.config.subjects;
        if subjects.is_empty() {
            return Ok(Vec::new());
        }
        let Some(last_exam) = subjects.iter().filter_map(|s| s.exam_date).max() else {
            return Ok(Vec::new());
        };

        let weekly = self.weekly_hours()?;
        let slots = self.collect_slots(today, last_exam, &weekly);

        let total_weight: u64 = subjects.iter().map(|s| u64::from(s.weight)).sum();
        if total_weight == 0 {
            return Ok(Vec::new());
        }

        #[allow(
            clippy::cast_precision_loss,
            clippy::cast_possible_truncation,
            clippy::cast_sign_loss
        )]
        let needed: Vec<usize> = subjects
            .iter()
            .map(|s| {
                (slots.len() as f64 * f64::from(s.weight) / total_weight as f64).round() as usize
            })
            .collect();
        let mut assigned = vec![0_usize; subjects.len()];

        let mut schedule = Vec::with_capacity(slots.len());
        let mut free = slots.into_iter();
        'fill: loop {
            let mut progressed = false;
            for (idx, subject) in subjects.iter().enumerate() {
                if assigned[idx] >= needed[idx] {
                    continue;
                }
                let Some(slot) = free.next() else {
                    break 'fill;
                };
                let start_time = slot.date.and_time(slot.time);
                schedule.push(ScheduledSession {
                    subject_name: subject.name.clone(),
                    subject_color: subject.color.clone(),
                    subject_local_id: subject.local_id,
                    start_time,
                    end_time: start_time + Duration::hours(SESSION_LENGTH_HOURS),
                });
                assigned[idx] += 1;
                progressed = true;
            }
            if !progressed {
                break;
            }
        }

        Ok(schedule)
    }

    fn weekly_hours(&self) -> Result<HashMap<Weekday, Vec<NaiveTime>>, PlannerError> {
        let mut weekly = HashMap::new();
        for (day, hours) in &self.config.availability {
            let weekday = day
                .parse::<Weekday>()
                .map_err(|_| PlannerError::InvalidWeekday(day.clone()))?;
            let mut times = Vec::new();
            for (raw, free) in hours {
                let time = NaiveTime::parse_from_str(raw, "%H:%M")
                    .map_err(|_| PlannerError::InvalidTime(raw.clone()))?;
                if *free {
                    times.push(time);
                }
            }
            times.sort_unstable();
            weekly.insert(weekday, times);
        }
        Ok(weekly)
    }

    fn is_vacation(&self, date: NaiveDate) -> bool {
        self.config.vacations.iter().any(|v| v.covers(date))
    }

    fn collect_slots(
        &self,
        start: NaiveDate,
        end: NaiveDate,
        weekly: &HashMap<Weekday, Vec<NaiveTime>>,
    ) -> Vec<Slot> {
        let mut slots = Vec::new();
        for date in start.iter_days().take_while(|d| *d <= end) {
            if self.is_vacation(date) {
                slots.extend(
                    VACATION_HOURS
                        .iter()
                        .filter_map(|h| NaiveTime::from_hms_opt(*h, 0, 0))
                        .map(|time| Slot { date, time }),
                );
            } else if let Some(times) = weekly.get(&date.weekday()) {
                slots.extend(times.iter().map(|time| Slot { date, time: *time }));
            }
        }
        slots
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{PlannedSubject, Vacation};
    use std::collections::BTreeMap;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn subject(local_id: u32, name: &str, exam: Option<NaiveDate>, weight: u32) -> PlannedSubject {
        PlannedSubject {
            local_id,
            name: name.to_string(),
            exam_date: exam,
            weight,
            color: "#123456".to_string(),
        }
    }

    fn hours(pairs: &[(&str, bool)]) -> BTreeMap<String, bool> {
        pairs.iter().map(|(t, free)| ((*t).to_string(), *free)).collect()
    }

    fn week(days: Vec<(&str, BTreeMap<String, bool>)>) -> BTreeMap<String, BTreeMap<String, bool>> {
        days.into_iter().map(|(d, h)| (d.to_string(), h)).collect()
    }

    // 2024-01-01 is a Monday.
    const MONDAY: (i32, u32, u32) = (2024, 1, 1);

    fn monday() -> NaiveDate {
        date(MONDAY.0, MONDAY.1, MONDAY.2)
    }

    #[test]
    fn empty_inputs_produce_no_sessions() {
        let config = PlanConfig::default();
        assert!(ScheduleGenerator::new(&config).generate(monday()).unwrap().is_empty());

        let config = PlanConfig {
            subjects: vec![subject(0, "Physics", None, 1)],
            ..PlanConfig::default()
        };
        assert!(ScheduleGenerator::new(&config).generate(monday()).unwrap().is_empty());

        let config = PlanConfig {
            subjects: vec![subject(0, "Physics", Some(date(2024, 1, 7)), 0)],
            availability: week(vec![("Monday", hours(&[("18:00", true)]))]),
            ..PlanConfig::default()
        };
        assert!(ScheduleGenerator::new(&config).generate(monday()).unwrap().is_empty());
    }

    #[test]
    fn weights_split_available_hours() {
        let config = PlanConfig {
            subjects: vec![
                subject(0, "Physics", Some(date(2024, 1, 2)), 3),
                subject(1, "History", Some(date(2024, 1, 2)), 1),
            ],
            availability: week(vec![
                ("Monday", hours(&[("17:00", true), ("18:00", true), ("19:00", false)])),
                ("Tuesday", hours(&[("17:00", true), ("18:00", true)])),
            ]),
            vacations: Vec::new(),
        };

        let sessions = ScheduleGenerator::new(&config).generate(monday()).unwrap();
        assert_eq!(sessions.len(), 4);
        let physics = sessions.iter().filter(|s| s.subject_local_id == 0).count();
        assert_eq!(physics, 3);

        // Round-robin: physics, history, physics, physics.
        let order: Vec<u32> = sessions.iter().map(|s| s.subject_local_id).collect();
        assert_eq!(order, vec![0, 1, 0, 0]);
        assert_eq!(
            sessions[0].start_time,
            monday().and_hms_opt(17, 0, 0).unwrap()
        );
        assert_eq!(
            sessions[0].end_time - sessions[0].start_time,
            Duration::hours(1)
        );
    }

    #[test]
    fn vacation_days_use_fixed_hours() {
        let config = PlanConfig {
            subjects: vec![subject(0, "Maths", Some(monday()), 1)],
            availability: week(vec![("Monday", hours(&[("07:00", true)]))]),
            vacations: vec![Vacation::Day(monday())],
        };

        let sessions = ScheduleGenerator::new(&config).generate(monday()).unwrap();
        let hours: Vec<u32> = sessions
            .iter()
            .map(|s| chrono::Timelike::hour(&s.start_time))
            .collect();
        assert_eq!(hours, vec![9, 10, 11, 14, 15, 16]);
    }

    #[test]
    fn leftover_slots_do_not_stall_distribution() {
        // 3 slots, equal weights: each subject is owed round(1.5) = 2, only 3 exist.
        let config = PlanConfig {
            subjects: vec![
                subject(0, "A", Some(monday()), 1),
                subject(1, "B", Some(monday()), 1),
            ],
            availability: week(vec![(
                "Monday",
                hours(&[("08:00", true), ("09:00", true), ("10:00", true)]),
            )]),
            vacations: Vec::new(),
        };
        let sessions = ScheduleGenerator::new(&config).generate(monday()).unwrap();
        assert_eq!(sessions.len(), 3);

        // 3 slots, weights 1:4 → quotas 1 and 2.
        let config = PlanConfig {
            subjects: vec![
                subject(0, "A", Some(monday()), 1),
                subject(1, "B", Some(monday()), 4),
            ],
            ..config
        };
        let sessions = ScheduleGenerator::new(&config).generate(monday()).unwrap();
        assert_eq!(sessions.len(), 3);
        let config = PlanConfig {
            subjects: vec![
                subject(0, "A", Some(monday()), 1),
                subject(1, "B", Some(monday()), 9),
            ],
            ..config
        };
        let sessions = ScheduleGenerator::new(&config).generate(monday()).unwrap();
        // quotas round(0.3)=0 and round(2.7)=3
        assert_eq!(sessions.len(), 3);
        assert!(sessions.iter().all(|s| s.subject_local_id == 1));
    }

    #[test]
    fn exam_in_the_past_yields_nothing() {
        let config = PlanConfig {
            subjects: vec![subject(0, "A", Some(date(2023, 12, 1)), 1)],
            availability: week(vec![("Monday", hours(&[("08:00", true)]))]),
            vacations: Vec::new(),
        };
        assert!(ScheduleGenerator::new(&config).generate(monday()).unwrap().is_empty());
    }

    #[test]
    fn malformed_availability_is_rejected() {
        let config = PlanConfig {
            subjects: vec![subject(0, "A", Some(monday()), 1)],
            availability: week(vec![("Moonday", hours(&[("08:00", true)]))]),
            vacations: Vec::new(),
        };
        assert_eq!(
            ScheduleGenerator::new(&config).generate(monday()),
            Err(PlannerError::InvalidWeekday("Moonday".into()))
        );

        let config = PlanConfig {
            availability: week(vec![("Monday", hours(&[("8am", true)]))]),
            ..config
        };
        assert_eq!(
            ScheduleGenerator::new(&config).generate(monday()),
            Err(PlannerError::InvalidTime("8am".into()))
        );
    }
}
