//! End-to-end tests of the shared-state contract: assignment atomicity,
//! benign races, the chair state machine at the API boundary, and the
//! wire shapes polling terminals depend on.

use std::sync::Arc;
use std::thread;

use anyhow::Result;

use chairside_core::{
    ChairStatus, ClinicCore, ClinicError, PatientSnapshot, Priority, TreatmentType,
};

fn enqueue(core: &ClinicCore, name: &str, priority: Priority) -> chairside_core::Patient {
    core.enqueue_patient(name, "010-1234-5678", TreatmentType::Scaling, priority)
        .unwrap()
}

#[test]
fn concurrent_assign_to_two_chairs_binds_each_patient_once() -> Result<()> {
    let core = Arc::new(ClinicCore::open_in_memory()?);
    enqueue(&core, "Kim Minsu", Priority::Normal);
    enqueue(&core, "Lee Jieun", Priority::Normal);

    let handles: Vec<_> = [1i64, 2]
        .into_iter()
        .map(|chair_id| {
            let core = Arc::clone(&core);
            thread::spawn(move || core.assign_next(chair_id))
        })
        .collect();
    for handle in handles {
        handle.join().expect("assignment thread panicked")?;
    }

    // Both chairs active, each with a distinct patient, queue drained.
    let chairs = core.list_chairs()?;
    let one = chairs[0].patient.clone().unwrap();
    let two = chairs[1].patient.clone().unwrap();
    assert_eq!(chairs[0].status, ChairStatus::Active);
    assert_eq!(chairs[1].status, ChairStatus::Active);
    assert_ne!(one, two);
    assert!(core.list_queue()?.is_empty());
    Ok(())
}

#[test]
fn concurrent_assign_to_same_chair_admits_exactly_one() -> Result<()> {
    let core = Arc::new(ClinicCore::open_in_memory()?);
    enqueue(&core, "Kim Minsu", Priority::Normal);
    enqueue(&core, "Lee Jieun", Priority::Normal);

    let handles: Vec<_> = (0..2)
        .map(|_| {
            let core = Arc::clone(&core);
            thread::spawn(move || core.assign_next(1))
        })
        .collect();
    let results: Vec<_> = handles
        .into_iter()
        .map(|h| h.join().expect("assignment thread panicked"))
        .collect();

    let succeeded = results.iter().filter(|r| r.is_ok()).count();
    assert_eq!(succeeded, 1, "exactly one click may win the chair");
    assert!(results
        .iter()
        .filter_map(|r| r.as_ref().err())
        .all(|e| matches!(e, ClinicError::InvalidTransition(_))));

    // The loser consumed nothing: one patient still waits.
    assert_eq!(core.list_queue()?.len(), 1);
    Ok(())
}

#[test]
fn assign_on_empty_queue_is_reported_not_fatal() -> Result<()> {
    let core = ClinicCore::open_in_memory()?;
    let err = core.assign_next(1).unwrap_err();
    assert!(matches!(err, ClinicError::EmptyQueue));

    // State is untouched and the core keeps serving.
    assert_eq!(core.get_chair(1)?.status, ChairStatus::Idle);
    enqueue(&core, "Kim Minsu", Priority::Normal);
    assert_eq!(core.assign_next(1)?.status, ChairStatus::Active);
    Ok(())
}

#[test]
fn double_delete_is_a_benign_race() -> Result<()> {
    let core = ClinicCore::open_in_memory()?;
    let patient = enqueue(&core, "Kim Minsu", Priority::Normal);

    core.remove_patient(&patient.id)?;
    let err = core.remove_patient(&patient.id).unwrap_err();
    assert!(err.is_benign_not_found());

    // Queue is intact, not corrupted.
    assert!(core.list_queue()?.is_empty());
    Ok(())
}

#[test]
fn delete_of_consumed_patient_is_benign_not_found() -> Result<()> {
    let core = ClinicCore::open_in_memory()?;
    let patient = enqueue(&core, "Kim Minsu", Priority::Normal);
    core.assign_next(3)?;

    // A stale terminal still showing the patient in the queue tries to
    // delete them after another terminal assigned them.
    let err = core.remove_patient(&patient.id).unwrap_err();
    assert!(err.is_benign_not_found());

    // The assignment is unaffected.
    assert_eq!(core.get_chair(3)?.patient.as_deref(), Some("Kim Minsu"));
    Ok(())
}

#[test]
fn release_then_reassign_cycles_the_chair() -> Result<()> {
    let core = ClinicCore::open_in_memory()?;
    enqueue(&core, "Kim Minsu", Priority::Normal);
    enqueue(&core, "Lee Jieun", Priority::Normal);

    core.assign_next(1)?;
    let released = core.release_chair(1)?;
    assert_eq!(released.status, ChairStatus::Idle);
    assert_eq!(released.patient, None);

    // Released patient is terminal: next assignment takes the next entry.
    let chair = core.assign_next(1)?;
    assert_eq!(chair.patient.as_deref(), Some("Lee Jieun"));

    let history = core.history(10)?;
    assert_eq!(history.len(), 1);
    assert_eq!(history[0].patient_name, "Kim Minsu");
    Ok(())
}

#[test]
fn release_of_idle_chair_is_invalid_transition() -> Result<()> {
    let core = ClinicCore::open_in_memory()?;
    let err = core.release_chair(1).unwrap_err();
    assert!(matches!(err, ClinicError::InvalidTransition(_)));
    Ok(())
}

#[test]
fn update_chair_validates_patient_snapshot_rules() -> Result<()> {
    let core = ClinicCore::open_in_memory()?;
    let snapshot = PatientSnapshot {
        name: "Kim Minsu".into(),
        phone: "010-1234-5678".into(),
    };

    // Active without a patient is a validation failure.
    let err = core.update_chair(1, ChairStatus::Active, None).unwrap_err();
    assert!(matches!(err, ClinicError::Validation(_)));

    // A patient on idle/maintenance is a validation failure.
    let err = core
        .update_chair(1, ChairStatus::Maintenance, Some(snapshot.clone()))
        .unwrap_err();
    assert!(matches!(err, ClinicError::Validation(_)));

    // The legal form works.
    let chair = core.update_chair(1, ChairStatus::Active, Some(snapshot))?;
    assert_eq!(chair.status, ChairStatus::Active);
    Ok(())
}

#[test]
fn maintenance_flow() -> Result<()> {
    let core = ClinicCore::open_in_memory()?;
    enqueue(&core, "Kim Minsu", Priority::Normal);

    let chair = core.update_chair(2, ChairStatus::Maintenance, None)?;
    assert_eq!(chair.status, ChairStatus::Maintenance);

    // A chair under maintenance cannot receive a patient.
    let err = core.assign_next(2).unwrap_err();
    assert!(matches!(err, ClinicError::InvalidTransition(_)));

    core.update_chair(2, ChairStatus::Idle, None)?;
    assert_eq!(core.assign_next(2)?.status, ChairStatus::Active);
    Ok(())
}

#[test]
fn noop_update_does_not_touch_last_update() -> Result<()> {
    let core = ClinicCore::open_in_memory()?;
    let before = core.get_chair(1)?;

    let after = core.update_chair(1, ChairStatus::Idle, None)?;
    assert_eq!(after.last_update, before.last_update);
    Ok(())
}

#[test]
fn manual_active_to_idle_records_completion_like_release() -> Result<()> {
    let core = ClinicCore::open_in_memory()?;
    enqueue(&core, "Kim Minsu", Priority::Normal);
    core.assign_next(1)?;

    core.update_chair(1, ChairStatus::Idle, None)?;
    let history = core.history(10)?;
    assert_eq!(history.len(), 1);
    assert_eq!(history[0].chair_id, 1);

    let stats = core.stats()?;
    assert_eq!(stats.total_treatments, 1);
    Ok(())
}

#[test]
fn unknown_ids_surface_not_found() -> Result<()> {
    let core = ClinicCore::open_in_memory()?;
    enqueue(&core, "Kim Minsu", Priority::Normal);

    assert!(matches!(core.get_chair(99), Err(ClinicError::NotFound(_))));
    assert!(matches!(core.assign_next(99), Err(ClinicError::NotFound(_))));
    // The failed assignment consumed nothing.
    assert_eq!(core.list_queue()?.len(), 1);
    Ok(())
}

#[test]
fn enqueue_validation_errors() -> Result<()> {
    let core = ClinicCore::open_in_memory()?;

    let err = core
        .enqueue_patient("", "010-1234-5678", TreatmentType::Scaling, Priority::Normal)
        .unwrap_err();
    assert!(matches!(err, ClinicError::Validation(_)));

    let err = core
        .enqueue_patient("Kim", "not-a-phone", TreatmentType::Scaling, Priority::Normal)
        .unwrap_err();
    assert!(matches!(err, ClinicError::Validation(_)));

    assert!(core.list_queue()?.is_empty());
    Ok(())
}

#[test]
fn polling_views_serialize_with_wire_field_names() -> Result<()> {
    let core = ClinicCore::open_in_memory()?;
    let patient = enqueue(&core, "Kim Minsu", Priority::High);
    core.assign_next(1)?;
    enqueue(&core, "Lee Jieun", Priority::Normal);

    let chairs = serde_json::to_value(core.list_chairs()?)?;
    let first = &chairs[0];
    assert_eq!(first["status"], "active");
    assert_eq!(first["patient"], "Kim Minsu");
    assert!(first.get("patientPhone").is_some());
    assert!(first.get("elapsedMinutes").is_some());
    assert!(first.get("lastUpdate").is_some());

    let queue = serde_json::to_value(core.list_queue()?)?;
    let entry = &queue[0];
    assert_eq!(entry["name"], "Lee Jieun");
    assert_eq!(entry["type"], "scaling");
    assert_eq!(entry["priority"], "normal");
    assert!(entry.get("arrivalTime").is_some());

    let stats = serde_json::to_value(core.stats()?)?;
    assert!(stats.get("totalTreatments").is_some());
    assert!(stats.get("activeChairs").is_some());
    assert!(stats.get("avgWaitMinutes").is_some());
    assert!(stats.get("equipmentUsage").is_some());
    assert_eq!(stats["waitingCount"], 1);

    // The consumed patient appears nowhere in the queue anymore.
    assert!(core
        .list_queue()?
        .iter()
        .all(|p| p.id != patient.id));
    Ok(())
}

#[test]
fn repeated_polls_observe_monotonic_consistent_state() -> Result<()> {
    let core = Arc::new(ClinicCore::open_in_memory()?);
    for i in 0..4 {
        enqueue(&core, &format!("Patient {}", i), Priority::Normal);
    }

    // Writers mutate while a reader polls; every snapshot must be
    // internally consistent (nobody both waiting and in a chair).
    let writer = {
        let core = Arc::clone(&core);
        thread::spawn(move || -> Result<(), ClinicError> {
            for chair_id in 1..=4 {
                core.assign_next(chair_id)?;
            }
            for chair_id in 1..=4 {
                core.release_chair(chair_id)?;
            }
            Ok(())
        })
    };

    // Chairs are read before the queue: a patient seen in a chair was
    // popped before that read, so they can never show up in the later
    // queue read — any overlap is a real invariant violation.
    for _ in 0..50 {
        let chairs = core.list_chairs()?;
        let queue = core.list_queue()?;
        for patient in &queue {
            assert!(
                chairs.iter().all(|c| c.patient.as_deref() != Some(&patient.name)),
                "patient observed both waiting and in a chair"
            );
        }
    }
    writer.join().expect("writer panicked")?;

    assert!(core.list_queue()?.is_empty());
    assert_eq!(core.stats()?.total_treatments, 4);
    Ok(())
}
