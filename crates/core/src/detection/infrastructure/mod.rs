pub mod face_detection_adapter;
pub mod scripted_face_detector;
