//! Configuration of the authsync process and helpers to load it.
mod loading;
mod object;
mod runtime;

pub use self::loading::load;
pub use self::loading::Error;
pub use self::object::AuthorizationConf;
pub use self::object::Conf;
pub use self::runtime::RuntimeConf;
