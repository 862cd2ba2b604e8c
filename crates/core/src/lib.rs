//! Real-time gating of a live camera feed for face capture.
//!
//! Every frame is reduced to a face observation and a brightness sample and
//! run through a short-circuiting rule chain. Geometry helpers for the
//! guidance overlay and tap-to-focus live alongside so the presentation layer
//! and camera control stay consistent with the sensor frame.

pub mod shared {
    pub mod constants;
    pub mod frame;
    pub mod geometry;
    pub mod settings;
}

pub mod detection {
    pub mod domain {
        pub mod face_detector;
        pub mod face_observation;
    }
    pub mod infrastructure;
}

pub mod quality {
    pub mod brightness_estimator;
    pub mod quality_gate;
    pub mod validation_result;
}

pub mod overlay {
    pub mod overlay_geometry;
}

pub mod camera {
    pub mod domain {
        pub mod camera_device;
        pub mod focus_mapper;
        pub mod orientation;
    }
    pub mod camera_control;
    pub mod capture_session;
}

pub mod pipeline {
    pub mod capture_validator;
    pub mod frame_intake;
    pub mod pipeline_logger;
    pub mod single_flight;
    pub mod validation_listener;
}

pub mod replay {
    pub mod frame_source;
    pub mod manifest_frame_source;
    pub mod session_manifest;
}
