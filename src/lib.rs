#![allow(non_snake_case)]

// Базовые модули
pub mod config;
pub mod metrics;
pub mod node;
pub mod trace;

// Курсоры и хранилище
pub mod cursor; // src/cursor/{mod,state}.rs
pub mod store;  // src/store/{mod,memory,journal,lock}.rs

// Пагинаторы: flat / tree / dfs
pub mod paginate; // src/paginate/{mod,flat,tree,dfs}.rs

// HTTP-поверхность (tiny_http)
pub mod http; // src/http/{mod,handlers,query}.rs

// Удобные реэкспорты
pub use config::{ConfigBuilder, IntegrityPolicy, WalkConfig};
pub use cursor::{DfsCursor, FlatCursor, TreeCursor, WalkPoint};
pub use node::{Node, NodeKey};
pub use paginate::tree::Thread;
pub use paginate::{Cancelled, MissingParent, Page, PageContext, QueryBudget};
pub use store::{JournalStore, MemStore, OrderedStore, ParentFilter, SeekQuery, UnknownParent};
pub use trace::{LogTrace, NoTrace, Recorder, TraceEvent, TraceHook};
