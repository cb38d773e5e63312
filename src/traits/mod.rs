//! Core traits for the lifecycle container.

mod lifecycle;
mod resolver;

pub use lifecycle::{
    BlueprintPostProcessor, ContainerAware, DisposableComponent, FactoryComponent, InitializingComponent,
    StringValueResolver,
};
pub use resolver::{Resolver, ResolverCore};
