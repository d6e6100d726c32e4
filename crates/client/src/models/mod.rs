//! Data models for TM1 REST payloads.
//!
//! Types are organized by entity in submodules and re-exported here.
//! Request bodies are rendered by `body()` methods where the server expects
//! `@odata.bind` references instead of nested objects.

pub mod batch;
pub mod cellset;
pub mod common;
pub mod cube;
pub mod dimension;
pub mod file;
pub mod process;
pub mod sandbox;
pub mod security;
pub mod subset;
pub mod view;

pub use batch::{BatchRequest, BatchResponse};
pub use cellset::{Axis, AxisHierarchy, Cell, CellUpdate, CellValue, Cellset, Member, Tuple};
pub use common::{ErrorEnvelope, NamedRef, ODataCollection};
pub use cube::{Cube, RuleSyntaxError, is_control_name};
pub use dimension::{
    AttributeType, Dimension, Edge, Element, ElementAttribute, ElementType, Hierarchy,
};
pub use file::FileEntry;
pub use process::{
    AsciiSource, ParameterValue, Process, ProcessDataSource, ProcessExecuteStatus,
    ProcessParameter, ProcessResult, ProcessSyntaxError, ProcessVariable, ValueKind,
};
pub use sandbox::Sandbox;
pub use security::User;
pub use subset::Subset;
pub use view::{AxisSelection, MdxView, NativeView, TitleSelection, View};
