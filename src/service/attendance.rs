use chrono::{Local, Utc};
use std::sync::Arc;
use tracing::{info, instrument};

use crate::error::{AppError, AppResult};
use crate::model::attendance::{AttendanceRecord, CheckAction, CloseAttendance, NewAttendance, WorkType};
use crate::model::employee::Employee;
use crate::model::location::Location;
use crate::repo::{AttendanceRepository, EmployeeRepository, LocationRepository};
use crate::service::geofence::{self, GpsFix, LocationMatch, MatchMethod};
use crate::service::locks::EmployeeLocks;

#[derive(Debug, Clone, Copy, Default)]
pub struct CheckPolicy {
    /// Enforce the boundary on check-out in the per-location flow as well
    pub checkout_requires_geofence: bool,
}

/// Result of a successful check-in or check-out
#[derive(Debug, Clone)]
pub struct CheckOutcome {
    pub action: CheckAction,
    pub record: AttendanceRecord,
    pub employee_name: String,
    pub location_name: Option<String>,
    pub distance_m: Option<f64>,
    pub method: Option<MatchMethod>,
}

#[derive(Debug, Clone)]
pub struct ResolvedLocation {
    pub location: Location,
    pub distance_m: f64,
    pub method: MatchMethod,
}

impl From<LocationMatch<'_>> for ResolvedLocation {
    fn from(m: LocationMatch<'_>) -> Self {
        ResolvedLocation {
            location: m.location.clone(),
            distance_m: m.distance_m,
            method: m.method,
        }
    }
}

/// Check-in/check-out state machine. Per employee the state is CLOSED (no
/// open record) or OPEN (exactly one record without a check-out time).
pub struct AttendanceService {
    employees: Arc<dyn EmployeeRepository>,
    locations: Arc<dyn LocationRepository>,
    records: Arc<dyn AttendanceRepository>,
    locks: EmployeeLocks,
    policy: CheckPolicy,
}

impl AttendanceService {
    pub fn new(
        employees: Arc<dyn EmployeeRepository>,
        locations: Arc<dyn LocationRepository>,
        records: Arc<dyn AttendanceRepository>,
        locks: EmployeeLocks,
        policy: CheckPolicy,
    ) -> Self {
        Self {
            employees,
            locations,
            records,
            locks,
            policy,
        }
    }

    pub async fn profile(&self, employee_id: u64) -> AppResult<Option<Employee>> {
        self.employees.profile(employee_id).await
    }

    pub async fn open_record(&self, employee_id: u64) -> AppResult<Option<AttendanceRecord>> {
        self.records.open_record_for(employee_id).await
    }

    pub async fn assigned_locations(&self, employee_id: u64) -> AppResult<Vec<Location>> {
        self.locations.assigned_to(employee_id).await
    }

    /// Best assigned location for a fix (resolve-first flow)
    #[instrument(name = "attendance_resolve", skip(self, fix))]
    pub async fn resolve(&self, employee_id: u64, fix: GpsFix) -> AppResult<ResolvedLocation> {
        let assigned = self.locations.assigned_to(employee_id).await?;
        let found = geofence::resolve_location_for_point(&assigned, &fix)
            .map(ResolvedLocation::from)
            .inspect_err(|e| info!(reason = e.code(), "Location resolution rejected"))?;
        info!(
            location_id = found.location.id,
            method = %found.method,
            distance_m = found.distance_m,
            "Location resolved"
        );
        Ok(found)
    }

    /// Opens a record. With `location_id` the fix is checked against that
    /// location only, without it the best assigned location is used.
    #[instrument(name = "attendance_check_in", skip(self, fix))]
    pub async fn check_in(
        &self,
        employee_id: u64,
        location_id: Option<u64>,
        fix: GpsFix,
        work_type: WorkType,
    ) -> AppResult<CheckOutcome> {
        let _guard = self.locks.acquire(employee_id).await;

        let outcome = self.check_in_locked(employee_id, location_id, fix, work_type).await;
        match &outcome {
            Ok(o) => info!(
                record_id = o.record.id,
                location_id = o.record.location_id,
                distance_m = o.distance_m,
                "Checked in"
            ),
            Err(e) => info!(reason = e.code(), "Check-in rejected: {e}"),
        }
        outcome
    }

    async fn check_in_locked(
        &self,
        employee_id: u64,
        location_id: Option<u64>,
        fix: GpsFix,
        work_type: WorkType,
    ) -> AppResult<CheckOutcome> {
        let employee = self
            .employees
            .profile(employee_id)
            .await?
            .ok_or(AppError::NotFound("employee profile"))?;

        // re-read under the lock; the unique index backs this up at write time
        if let Some(open) = self.records.open_record_for(employee_id).await? {
            return Err(AppError::AlreadyCheckedIn { record_id: open.id });
        }

        let assigned = self.locations.assigned_to(employee_id).await?;
        let matched = match location_id {
            Some(id) => {
                let location = self.assigned_location(&assigned, id).await?;
                geofence::check_location(location, &fix)?
            }
            None => geofence::resolve_location_for_point(&assigned, &fix)?,
        };

        let shift_id = self
            .employees
            .active_shift_on(employee_id, Local::now().date_naive())
            .await?;

        let record = self
            .records
            .insert_open(NewAttendance {
                employee_id,
                location_id: Some(matched.location.id),
                shift_id,
                check_in_time: Utc::now(),
                work_type,
                notes: diagnostics(
                    CheckAction::CheckIn,
                    &fix,
                    Some(matched.distance_m),
                    Some(matched.method),
                ),
            })
            .await?;

        Ok(CheckOutcome {
            action: CheckAction::CheckIn,
            record,
            employee_name: employee.full_name,
            location_name: Some(matched.location.name.clone()),
            distance_m: Some(matched.distance_m),
            method: Some(matched.method),
        })
    }

    /// Closes the open record. The resolve-first flow (no `location_id`)
    /// requires a boundary match; the per-location flow only records the
    /// diagnostics unless the policy asks for a match.
    #[instrument(name = "attendance_check_out", skip(self, fix))]
    pub async fn check_out(
        &self,
        employee_id: u64,
        location_id: Option<u64>,
        fix: GpsFix,
    ) -> AppResult<CheckOutcome> {
        let _guard = self.locks.acquire(employee_id).await;

        let outcome = self.check_out_locked(employee_id, location_id, fix).await;
        match &outcome {
            Ok(o) => info!(record_id = o.record.id, distance_m = o.distance_m, "Checked out"),
            Err(e) => info!(reason = e.code(), "Check-out rejected: {e}"),
        }
        outcome
    }

    async fn check_out_locked(
        &self,
        employee_id: u64,
        location_id: Option<u64>,
        fix: GpsFix,
    ) -> AppResult<CheckOutcome> {
        let employee = self
            .employees
            .profile(employee_id)
            .await?
            .ok_or(AppError::NotFound("employee profile"))?;

        let open = self
            .records
            .open_record_for(employee_id)
            .await?
            .ok_or(AppError::NoOpenRecord)?;

        let assigned = self.locations.assigned_to(employee_id).await?;
        let (location, distance_m, method) = match location_id {
            None => {
                let m = geofence::resolve_location_for_point(&assigned, &fix)?;
                (Some(m.location.clone()), Some(m.distance_m), Some(m.method))
            }
            Some(id) if self.policy.checkout_requires_geofence => {
                let location = self.assigned_location(&assigned, id).await?;
                let m = geofence::check_location(location, &fix)?;
                (Some(m.location.clone()), Some(m.distance_m), Some(m.method))
            }
            Some(id) => match self.checkout_reference(&assigned, id, open.location_id).await? {
                Some(location) => {
                    let eval = geofence::evaluate(&location, &fix);
                    (Some(location), eval.distance_m, eval.method)
                }
                None => (None, None, None),
            },
        };

        let outbound = diagnostics(CheckAction::CheckOut, &fix, distance_m, method);
        let notes = match open.notes.as_deref() {
            Some(existing) if !existing.is_empty() => format!("{existing}\n{outbound}"),
            _ => outbound,
        };

        let record = self
            .records
            .close(CloseAttendance {
                record_id: open.id,
                check_out_time: Utc::now(),
                notes,
                backfill_location_id: location.as_ref().map(|l| l.id),
            })
            .await?;

        let location_name = match (record.location_id, &location) {
            (Some(id), Some(l)) if id == l.id => Some(l.name.clone()),
            (Some(id), _) => match assigned.iter().find(|l| l.id == id) {
                Some(l) => Some(l.name.clone()),
                None => self.locations.find(id).await?.map(|l| l.name),
            },
            (None, _) => None,
        };

        Ok(CheckOutcome {
            action: CheckAction::CheckOut,
            record,
            employee_name: employee.full_name,
            location_name,
            distance_m,
            method,
        })
    }

    /// Location a relaxed check-out is measured against: the named one if it
    /// still exists (assigned or not), else the open record's own location.
    /// Losing an assignment while on duty never blocks closing the record.
    async fn checkout_reference(
        &self,
        assigned: &[Location],
        location_id: u64,
        open_location_id: Option<u64>,
    ) -> AppResult<Option<Location>> {
        if let Some(location) = assigned.iter().find(|l| l.id == location_id) {
            return Ok(Some(location.clone()));
        }
        if let Some(location) = self.locations.find(location_id).await? {
            return Ok(Some(location));
        }
        match open_location_id {
            Some(id) => self.locations.find(id).await,
            None => Ok(None),
        }
    }

    async fn assigned_location<'a>(
        &self,
        assigned: &'a [Location],
        location_id: u64,
    ) -> AppResult<&'a Location> {
        if let Some(location) = assigned.iter().find(|l| l.id == location_id) {
            return Ok(location);
        }
        match self.locations.find(location_id).await? {
            Some(_) => Err(AppError::LocationNotAssigned),
            None => Err(AppError::NotFound("location")),
        }
    }
}

/// Raw GPS audit line stored in the record notes
fn diagnostics(
    action: CheckAction,
    fix: &GpsFix,
    distance_m: Option<f64>,
    method: Option<MatchMethod>,
) -> String {
    let distance = distance_m.map_or_else(|| "n/a".to_string(), |d| format!("{d:.1}m"));
    let method = method.map_or_else(|| "none".to_string(), |m| m.to_string());
    format!(
        "{action} lat={:.6} lng={:.6} accuracy={:.1}m distance={distance} method={method}",
        fix.point.lat, fix.point.lng, fix.accuracy_m
    )
}
