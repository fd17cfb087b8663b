pub mod assistant;
pub mod domain;
pub mod intent;
pub mod ports;

pub use assistant::Assistant;
pub use domain::{
    AuthSession, ChatMessage, ChatThread, Principal, PrincipalCredentials, Role, RoleProfile,
};
pub use intent::{classify, Intent, Qualifier, Scope, Subject, Track};
pub use ports::{
    AnalyticsService, ChatService, DirectoryService, HelpDeskService, PortError, PortResult,
};
