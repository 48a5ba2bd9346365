//! Keyword libraries: named bundles of keywords dispatched by name.
//!
//! A [`KeywordLibrary`] is built once at startup from a [`LibraryBuilder`]
//! and is immutable afterwards. Each keyword is stored as a type-erased
//! callable together with its declared parameter names and return shape, so
//! the dispatcher never needs to know the concrete library type.
//!
//! Every invocation creates a fresh execution context through the library's
//! factory; no state is carried between calls.

pub mod hyperv;
pub mod loader;
pub mod powershell;

pub use hyperv::{HyperVMgmtLibrary, HypervisorHost, StateChange, VmSummary};
pub use loader::{load_library, LoadError, HYPERV_LIBRARY_TYPE};
pub use powershell::PowerShellHost;

use std::any::Any;
use std::collections::HashMap;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;

use robot_remote_core::{KeywordFault, KeywordOutput, KeywordReturn, ReturnShape, Value};

type KeywordBody = dyn Fn(&[Value]) -> Result<KeywordReturn, KeywordFault> + Send + Sync;

type ContextFactory<C> = dyn Fn() -> anyhow::Result<C> + Send + Sync;

// ---------------------------------------------------------------------------
// Keyword
// ---------------------------------------------------------------------------

/// A single callable keyword.
pub struct Keyword {
    name: String,
    params: Vec<String>,
    shape: ReturnShape,
    body: Box<KeywordBody>,
}

impl Keyword {
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Declared parameter names, in positional order.
    #[must_use]
    pub fn params(&self) -> &[String] {
        &self.params
    }

    #[must_use]
    pub fn return_shape(&self) -> ReturnShape {
        self.shape
    }

    /// Invokes the keyword with positional arguments.
    ///
    /// A panic inside the keyword body is caught and reported as a fault so
    /// a misbehaving keyword cannot take the server down.
    ///
    /// # Errors
    ///
    /// Returns a [`KeywordFault`] on arity mismatch, argument coercion
    /// failure, context construction failure, an error returned by the body,
    /// or a panic.
    pub fn invoke(&self, args: &[Value]) -> Result<KeywordReturn, KeywordFault> {
        catch_unwind(AssertUnwindSafe(|| (self.body)(args))).unwrap_or_else(|payload| {
            Err(KeywordFault::new(format!(
                "Keyword '{}' panicked: {}",
                self.name,
                panic_message(payload.as_ref())
            )))
        })
    }
}

impl std::fmt::Debug for Keyword {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Keyword")
            .field("name", &self.name)
            .field("params", &self.params)
            .field("shape", &self.shape)
            .finish_non_exhaustive()
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic payload".to_string()
    }
}

// ---------------------------------------------------------------------------
// Args
// ---------------------------------------------------------------------------

/// Positional arguments handed to a keyword body, with typed accessors.
///
/// Accessors report coercion failures as faults naming the keyword, the
/// 1-based argument position and the received value type.
#[derive(Debug, Clone, Copy)]
pub struct Args<'a> {
    keyword: &'a str,
    values: &'a [Value],
}

impl<'a> Args<'a> {
    #[must_use]
    pub fn new(keyword: &'a str, values: &'a [Value]) -> Self {
        Self { keyword, values }
    }

    /// # Errors
    ///
    /// Returns a fault if the argument is missing or is not a string.
    pub fn string(&self, index: usize) -> Result<String, KeywordFault> {
        self.coerce(index, Value::coerce_string)
    }

    /// # Errors
    ///
    /// Returns a fault if the argument is missing or cannot be read as an int.
    pub fn int(&self, index: usize) -> Result<i64, KeywordFault> {
        self.coerce(index, Value::coerce_int)
    }

    /// # Errors
    ///
    /// Returns a fault if the argument is missing or cannot be read as a bool.
    pub fn bool(&self, index: usize) -> Result<bool, KeywordFault> {
        self.coerce(index, Value::coerce_bool)
    }

    fn coerce<T>(
        &self,
        index: usize,
        f: impl FnOnce(&Value) -> Result<T, robot_remote_core::CoercionError>,
    ) -> Result<T, KeywordFault> {
        let position = index + 1;
        let value = self.values.get(index).ok_or_else(|| {
            KeywordFault::new(format!(
                "Keyword '{}' is missing argument {position}.",
                self.keyword
            ))
        })?;
        f(value).map_err(|e| {
            KeywordFault::new(format!(
                "Invalid argument {position} for keyword '{}': {e}",
                self.keyword
            ))
        })
    }
}

// ---------------------------------------------------------------------------
// KeywordLibrary
// ---------------------------------------------------------------------------

/// An immutable set of keywords identified by a library type name.
#[derive(Debug)]
pub struct KeywordLibrary {
    type_name: String,
    keywords: Vec<Keyword>,
    index: HashMap<String, usize>,
}

impl KeywordLibrary {
    /// Fully-qualified library type name, e.g. `RobotFramework.HyperVMgmtLibrary`.
    #[must_use]
    pub fn type_name(&self) -> &str {
        &self.type_name
    }

    /// Keywords in declaration order.
    pub fn keywords(&self) -> impl Iterator<Item = &Keyword> {
        self.keywords.iter()
    }

    #[must_use]
    pub fn keyword(&self, name: &str) -> Option<&Keyword> {
        self.index.get(name).map(|&i| &self.keywords[i])
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.keywords.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.keywords.is_empty()
    }
}

// ---------------------------------------------------------------------------
// LibraryBuilder
// ---------------------------------------------------------------------------

/// Builds a [`KeywordLibrary`] whose keywords share an execution context
/// type `C`, created fresh for each call by `factory`.
pub struct LibraryBuilder<C> {
    type_name: String,
    factory: Arc<ContextFactory<C>>,
    keywords: Vec<Keyword>,
}

impl<C: 'static> LibraryBuilder<C> {
    pub fn new(
        type_name: impl Into<String>,
        factory: impl Fn() -> anyhow::Result<C> + Send + Sync + 'static,
    ) -> Self {
        Self {
            type_name: type_name.into(),
            factory: Arc::new(factory),
            keywords: Vec::new(),
        }
    }

    /// Registers a keyword. The return shape is taken from `R`.
    ///
    /// The registered wrapper rejects calls whose argument count differs from
    /// `params.len()` before constructing the context.
    #[must_use]
    pub fn keyword<R, F>(mut self, name: &str, params: &[&str], body: F) -> Self
    where
        R: KeywordOutput,
        F: Fn(&mut C, &Args<'_>) -> Result<R, KeywordFault> + Send + Sync + 'static,
    {
        let factory = Arc::clone(&self.factory);
        let keyword_name = name.to_string();
        let arity = params.len();

        let wrapper = move |values: &[Value]| -> Result<KeywordReturn, KeywordFault> {
            if values.len() != arity {
                return Err(KeywordFault::new("Parameter count mismatch."));
            }
            let mut ctx = factory().map_err(|e| {
                KeywordFault::from(e.context(format!(
                    "Failed to create execution context for keyword '{keyword_name}'"
                )))
            })?;
            let args = Args::new(&keyword_name, values);
            body(&mut ctx, &args).map(KeywordOutput::into_return)
        };

        self.keywords.push(Keyword {
            name: name.to_string(),
            params: params.iter().map(|p| (*p).to_string()).collect(),
            shape: R::SHAPE,
            body: Box::new(wrapper),
        });
        self
    }

    /// Finalizes the library.
    ///
    /// # Errors
    ///
    /// Returns [`LoadError::DuplicateKeyword`] if two keywords share a name,
    /// or [`LoadError::ReservedName`] if a keyword uses the name reserved for
    /// the remote shutdown pseudo-keyword.
    pub fn build(self) -> Result<KeywordLibrary, LoadError> {
        let mut index = HashMap::with_capacity(self.keywords.len());
        for (i, keyword) in self.keywords.iter().enumerate() {
            if keyword.name == robot_remote_core::STOP_REMOTE_SERVER {
                return Err(LoadError::ReservedName(keyword.name.clone()));
            }
            if index.insert(keyword.name.clone(), i).is_some() {
                return Err(LoadError::DuplicateKeyword(keyword.name.clone()));
            }
        }
        Ok(KeywordLibrary {
            type_name: self.type_name,
            keywords: self.keywords,
            index,
        })
    }
}
