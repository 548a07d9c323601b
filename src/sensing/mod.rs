pub mod controller;
pub mod gate;
pub mod loop_worker;

pub use controller::SensingController;
pub use gate::FrameGate;
pub use loop_worker::Frame;
