use chrono::NaiveTime;

/// Clock rules for a working day, all in server local time.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AttendancePolicy {
    /// First instant a check-in is accepted (inclusive).
    pub check_in_opens: NaiveTime,
    /// Last instant a check-in is accepted (inclusive).
    pub check_in_closes: NaiveTime,
    /// A check-in strictly after this is late.
    pub late_after: NaiveTime,
    /// First instant a check-out is accepted (inclusive).
    pub check_out_opens: NaiveTime,
    pub min_work_hours: f64,
}

pub(crate) fn clock(hour: u32, minute: u32) -> NaiveTime {
    NaiveTime::from_hms_opt(hour, minute, 0).expect("hour and minute in range")
}

impl Default for AttendancePolicy {
    fn default() -> Self {
        Self {
            check_in_opens: clock(8, 0),
            check_in_closes: clock(9, 15),
            late_after: clock(9, 15),
            check_out_opens: clock(17, 0),
            min_work_hours: 8.0,
        }
    }
}

impl AttendancePolicy {
    pub fn within_check_in_window(&self, now: NaiveTime) -> bool {
        self.check_in_opens <= now && now <= self.check_in_closes
    }

    pub fn is_late(&self, check_in: NaiveTime) -> bool {
        check_in > self.late_after
    }

    pub fn within_check_out_window(&self, now: NaiveTime) -> bool {
        now >= self.check_out_opens
    }
}
