pub mod actuator;
pub mod marker;
pub mod opto;

pub use actuator::{LogActuatorSink, TcpActuatorSink};
pub use marker::{LogEventSink, TcpEventSink};
pub use opto::{MeasurementRequest, OptoApiClient, VendorError, element_value, xml_to_marker};
