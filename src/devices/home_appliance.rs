use crate::error::{ConfigError, Error, Result};

const HOURS_PER_DAY: usize = 24;

/// Daily recurring window in which an appliance may start.
///
/// Hour indices of the horizon are counted from midnight of the first day, so
/// horizon hour `h` falls on hour of day `h % 24`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeWindow {
    /// First hour of day (0-23) at which a start is allowed.
    pub start_hour: usize,
    /// Window length in hours (1-24); may wrap past midnight.
    pub duration_h: usize,
}

impl TimeWindow {
    pub fn new(start_hour: usize, duration_h: usize) -> Self {
        Self {
            start_hour,
            duration_h,
        }
    }

    /// Returns true if horizon hour `hour` lies inside this window.
    pub fn contains(&self, hour: usize) -> bool {
        let hour_of_day = hour % HOURS_PER_DAY;
        (hour_of_day + HOURS_PER_DAY - self.start_hour) % HOURS_PER_DAY < self.duration_h
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct HomeApplianceParameters {
    pub device_id: String,
    /// Energy consumed over one complete run.
    pub consumption_wh: f64,
    /// Contiguous run length in hours.
    pub duration_h: usize,
    /// Allowed start windows; empty means the whole horizon.
    pub time_windows: Vec<TimeWindow>,
}

impl HomeApplianceParameters {
    pub fn new(device_id: impl Into<String>, consumption_wh: f64, duration_h: usize) -> Self {
        Self {
            device_id: device_id.into(),
            consumption_wh,
            duration_h,
            time_windows: Vec::new(),
        }
    }

    pub fn with_time_window(mut self, window: TimeWindow) -> Self {
        self.time_windows.push(window);
        self
    }

    /// # Errors
    ///
    /// Returns the first `ConfigError` found.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let id = &self.device_id;
        if !(self.consumption_wh.is_finite() && self.consumption_wh >= 0.0) {
            return Err(ConfigError::new(
                format!("{id}.consumption_wh"),
                format!("must be >= 0, got {}", self.consumption_wh),
            ));
        }
        if self.duration_h == 0 {
            return Err(ConfigError::new(format!("{id}.duration_h"), "must be >= 1"));
        }
        for (i, window) in self.time_windows.iter().enumerate() {
            if window.start_hour >= HOURS_PER_DAY {
                return Err(ConfigError::new(
                    format!("{id}.time_windows[{i}].start_hour"),
                    format!("must be in [0, 23], got {}", window.start_hour),
                ));
            }
            if !(1..=HOURS_PER_DAY).contains(&window.duration_h) {
                return Err(ConfigError::new(
                    format!("{id}.time_windows[{i}].duration_h"),
                    format!("must be in [1, 24], got {}", window.duration_h),
                ));
            }
        }
        Ok(())
    }
}

/// Schedulable appliance with a fixed-length, flat load profile.
#[derive(Debug, Clone)]
pub struct HomeAppliance {
    params: HomeApplianceParameters,
    start_allowed: Vec<bool>,
    earliest_start: usize,
    latest_start: usize,
    load_curve: Vec<f64>,
    start_hour: Option<usize>,
}

impl HomeAppliance {
    /// Creates an appliance for a horizon of `hours`.
    ///
    /// # Errors
    ///
    /// Returns `Error::Config` if a parameter is out of range or no hour of
    /// the horizon lies inside an allowed window.
    pub fn new(params: HomeApplianceParameters, hours: usize) -> Result<Self> {
        params.validate()?;

        let start_allowed: Vec<bool> = (0..hours)
            .map(|h| {
                params.time_windows.is_empty() || params.time_windows.iter().any(|w| w.contains(h))
            })
            .collect();
        let earliest_start = start_allowed.iter().position(|&a| a);
        let latest_start = start_allowed.iter().rposition(|&a| a);
        let (Some(earliest_start), Some(latest_start)) = (earliest_start, latest_start) else {
            return Err(ConfigError::new(
                format!("{}.time_windows", params.device_id),
                "no allowed start hour inside the horizon",
            )
            .into());
        };

        Ok(Self {
            params,
            start_allowed,
            earliest_start,
            latest_start,
            load_curve: vec![0.0; hours],
            start_hour: None,
        })
    }

    pub fn device_id(&self) -> &str {
        &self.params.device_id
    }

    pub fn parameters(&self) -> &HomeApplianceParameters {
        &self.params
    }

    pub fn hours(&self) -> usize {
        self.load_curve.len()
    }

    pub fn earliest_start(&self) -> usize {
        self.earliest_start
    }

    pub fn latest_start(&self) -> usize {
        self.latest_start
    }

    pub fn is_start_allowed(&self, hour: usize) -> bool {
        self.start_allowed.get(hour).copied().unwrap_or(false)
    }

    /// Allowed start hours at or after `global_start_hour`.
    pub fn allowed_start_hours(&self, global_start_hour: usize) -> Vec<usize> {
        (global_start_hour..self.start_allowed.len())
            .filter(|&h| self.start_allowed[h])
            .collect()
    }

    /// Start hour chosen by the last call to `set_starting_time`.
    pub fn start_hour(&self) -> Option<usize> {
        self.start_hour
    }

    /// Clears the load curve and the chosen start hour.
    pub fn reset(&mut self) {
        self.load_curve.iter_mut().for_each(|wh| *wh = 0.0);
        self.start_hour = None;
    }

    /// Anchors the run at `candidate_hour` and rebuilds the load curve.
    ///
    /// A candidate outside the allowed windows (or before
    /// `global_start_hour`) is moved to the latest allowed hour if that is
    /// still ahead, otherwise to the first daily recurrence of the earliest
    /// allowed hour at or after `global_start_hour`.
    ///
    /// # Returns
    ///
    /// The start hour actually used. It may lie beyond the horizon, in which
    /// case the load curve stays empty.
    pub fn set_starting_time(&mut self, candidate_hour: usize, global_start_hour: usize) -> usize {
        let start = if candidate_hour >= global_start_hour && self.is_start_allowed(candidate_hour)
        {
            candidate_hour
        } else if self.latest_start >= global_start_hour {
            self.latest_start
        } else {
            let behind = global_start_hour - self.earliest_start;
            self.earliest_start + behind.div_ceil(HOURS_PER_DAY).max(1) * HOURS_PER_DAY
        };

        self.reset();
        let hours = self.load_curve.len();
        let per_hour = self.params.consumption_wh / self.params.duration_h as f64;
        let end = (start + self.params.duration_h).min(hours);
        if start < end {
            self.load_curve[start..end]
                .iter_mut()
                .for_each(|wh| *wh = per_hour);
        }
        self.start_hour = Some(start);
        start
    }

    pub fn load_curve(&self) -> &[f64] {
        &self.load_curve
    }

    pub fn get_load_for_hour(&self, hour: usize) -> f64 {
        self.load_curve.get(hour).copied().unwrap_or(0.0)
    }

    pub(crate) fn ensure_hours(&self, hours: usize) -> Result<()> {
        if self.hours() == hours {
            Ok(())
        } else {
            Err(Error::DeviceHorizon {
                device: self.device_id().to_string(),
                expected: hours,
                actual: self.hours(),
            })
        }
    }
}
