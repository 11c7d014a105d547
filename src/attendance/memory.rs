use std::collections::HashMap;
use std::sync::Mutex;

use chrono::NaiveDate;

use super::store::AttendanceStore;
use crate::model::attendance::AttendanceRecord;

/// Map-backed store with the same guarded-write semantics as the MySQL one.
#[derive(Default)]
pub struct MemoryAttendanceStore {
    records: Mutex<HashMap<(u64, NaiveDate), AttendanceRecord>>,
}

impl MemoryAttendanceStore {
    pub fn get(&self, employee_id: u64, date: NaiveDate) -> Option<AttendanceRecord> {
        self.records
            .lock()
            .unwrap()
            .get(&(employee_id, date))
            .cloned()
    }

    pub fn insert(&self, record: AttendanceRecord) {
        self.records
            .lock()
            .unwrap()
            .insert((record.employee_id, record.date), record);
    }

    pub fn len(&self) -> usize {
        self.records.lock().unwrap().len()
    }
}

impl AttendanceStore for MemoryAttendanceStore {
    async fn find(
        &self,
        employee_id: u64,
        date: NaiveDate,
    ) -> Result<Option<AttendanceRecord>, sqlx::Error> {
        Ok(self.get(employee_id, date))
    }

    async fn upsert_check_in(&self, record: &AttendanceRecord) -> Result<bool, sqlx::Error> {
        let mut records = self.records.lock().unwrap();
        let stored = records
            .entry((record.employee_id, record.date))
            .or_insert_with(|| AttendanceRecord::absent(record.employee_id, record.date));

        if stored.check_in_time.is_some() {
            return Ok(false);
        }
        stored.check_in_time = record.check_in_time;
        stored.status = record.status;
        stored.is_late = record.is_late;
        Ok(true)
    }

    async fn upsert_check_out(&self, record: &AttendanceRecord) -> Result<bool, sqlx::Error> {
        let mut records = self.records.lock().unwrap();
        match records.get_mut(&(record.employee_id, record.date)) {
            Some(stored) if stored.check_in_time.is_some() && stored.check_out_time.is_none() => {
                stored.check_out_time = record.check_out_time;
                Ok(true)
            }
            _ => Ok(false),
        }
    }
}
