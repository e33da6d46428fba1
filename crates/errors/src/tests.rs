use super::*;

#[test]
fn test_error_display() {
    let err = SchedulerError::image_pull("alpine:3", "manifest unknown");
    assert_eq!(
        err.to_string(),
        "image pull failed: alpine:3: manifest unknown"
    );

    let err = SchedulerError::runtime_error("connection refused");
    assert_eq!(err.to_string(), "container runtime error: connection refused");

    let err = SchedulerError::DispatcherUnavailable;
    assert_eq!(err.to_string(), "dispatcher is not running");
}

#[test]
fn test_helpers_build_matching_variants() {
    assert!(matches!(
        SchedulerError::image_pull("alpine:3", "denied"),
        SchedulerError::ImagePull { image, .. } if image == "alpine:3"
    ));
    assert!(matches!(
        SchedulerError::internal("bad transition"),
        SchedulerError::Internal(_)
    ));
}
