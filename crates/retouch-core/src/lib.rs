pub mod convert;
pub mod error;
pub mod event;
pub mod mode;
pub mod session;
pub mod studio;

pub use convert::{ConvertError, DataUrlConverter, DisplayImage, PayloadConverter};
pub use error::StudioError;
pub use event::StudioEvent;
pub use mode::{EditMode, Preset, ReferencePolicy, UnknownMode};
pub use session::{BaseImage, Session, SessionError, SessionSnapshot, Step};
pub use studio::{Applied, EditIntent, EditKind, Notice, SourceImage, Studio};
