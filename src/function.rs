// 🎛️ Decoratable Function - A pure transformation plus layered modifiers
//
// Holds the base transformation, the ordered list of modifiers applied so
// far, and the single composed callable that `execute` runs. Composition
// happens once per `apply_modifier`, never on the call path.

use crate::error::PipelineResult;
use crate::modifier::{Callable, Modifier};
use std::sync::Arc;

pub struct DecoratableFunction<I, O> {
    name: String,
    base: Callable<I, O>,
    modifiers: Vec<String>,
    current: Callable<I, O>,
}

impl<I, O> DecoratableFunction<I, O>
where
    I: 'static,
    O: 'static,
{
    /// Wrap an infallible pure transformation
    pub fn new<F>(name: &str, transform: F) -> Self
    where
        F: Fn(I) -> O + Send + Sync + 'static,
    {
        Self::fallible(name, move |input| Ok(transform(input)))
    }

    /// Wrap a transformation that can fail with a pipeline error
    pub fn fallible<F>(name: &str, transform: F) -> Self
    where
        F: Fn(I) -> PipelineResult<O> + Send + Sync + 'static,
    {
        let base: Callable<I, O> = Arc::new(transform);
        DecoratableFunction {
            name: name.to_string(),
            current: Arc::clone(&base),
            base,
            modifiers: Vec::new(),
        }
    }

    /// Run the composed callable
    pub fn execute(&self, input: I) -> PipelineResult<O> {
        (self.current)(input)
    }

    /// Replace the current callable with `modifier` wrapped around it.
    ///
    /// Takes effect for calls made after it returns; `&mut self` keeps it
    /// from racing an in-flight `execute`.
    pub fn apply_modifier<M>(&mut self, modifier: M) -> &mut Self
    where
        M: Modifier<I, O>,
    {
        self.modifiers.push(modifier.name().to_string());
        self.current = modifier.wrap(Arc::clone(&self.current));
        self
    }

    /// Builder form of `apply_modifier`
    pub fn with<M>(mut self, modifier: M) -> Self
    where
        M: Modifier<I, O>,
    {
        self.apply_modifier(modifier);
        self
    }

    /// Run the bare transformation, skipping every modifier
    pub fn execute_undecorated(&self, input: I) -> PipelineResult<O> {
        (self.base)(input)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Modifier names in application order (innermost first)
    pub fn modifiers(&self) -> &[String] {
        &self.modifiers
    }

    pub fn describe(&self) -> String {
        if self.modifiers.is_empty() {
            self.name.clone()
        } else {
            format!("{} [{}]", self.name, self.modifiers.join(" → "))
        }
    }
}

impl<I, O> Clone for DecoratableFunction<I, O> {
    fn clone(&self) -> Self {
        DecoratableFunction {
            name: self.name.clone(),
            base: Arc::clone(&self.base),
            modifiers: self.modifiers.clone(),
            current: Arc::clone(&self.current),
        }
    }
}

impl<I, O> std::fmt::Debug for DecoratableFunction<I, O> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DecoratableFunction")
            .field("name", &self.name)
            .field("modifiers", &self.modifiers)
            .finish()
    }
}

// ============================================================================
// TESTS
// ============================================================================
