//! # Observer pattern: subjects, observers and observable attributes
//!
//! - [`Subject`] keeps an ordered, non-owning list of observers and
//!   broadcasts to them synchronously.
//! - [`ObservableAttribute`] is a named value holder. Writes go through
//!   [`Notifier::set_attribute`], which stores the value and then notifies.
//! - [`SharedSubject`] is the thread-safe variant (snapshot, then notify).
//! - [`weather`] is the weather-station demonstration built on top, and
//!   [`scenario`] replays scripted readings through it.
//!
//! ```
//! use std::cell::RefCell;
//! use std::rc::Rc;
//! use weather_observer::{ConditionsDisplay, Notifier, WeatherData};
//!
//! let mut data = WeatherData::new();
//! let display = Rc::new(RefCell::new(ConditionsDisplay::new()));
//! data.register_observer(display.clone()).unwrap();
//!
//! data.set_temp(42.0).unwrap();
//! assert_eq!(
//!     display.borrow().last(),
//!     Some("Current conditions: 42 deg F and 0% humidity")
//! );
//! ```

pub mod attribute;
pub mod config;
pub mod error;
pub mod notifier;
pub mod scenario;
pub mod subject;
pub mod sync;
pub mod weather;

pub use attribute::ObservableAttribute;
pub use config::{DuplicatePolicy, NotifyPolicy, SubjectConfig};
pub use error::{ConfigError, NotifyError, ObserverError, UpdateError};
pub use notifier::Notifier;
pub use scenario::{Report, Scenario};
pub use subject::{Observer, ObserverHandle, Subject};
pub use sync::{SharedObserver, SharedSubject};
pub use weather::{ConditionsDisplay, Measurement, StatisticsDisplay, ThresholdAlarm, WeatherData};
