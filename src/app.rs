//! The app: context, stacks and synthesis.
//!
//! Synthesis runs in three passes over a copy of the declared stacks:
//!
//! 1. Values tagged with a producing stack ([`Expr::Imported`]) are resolved.
//!    Inside the producer they become plain local expressions; elsewhere the
//!    producer gains an exported output and the consumer reads it with
//!    `Fn::ImportValue`, which also records a stack dependency.
//! 2. Every `Ref`, `Fn::GetAtt` and `DependsOn` is checked against the
//!    resources of its own stack.
//! 3. Stacks are ordered by their dependencies and rendered.

use indexmap::IndexMap;
use tracing::{debug, info};

use crate::assembly::{CloudAssembly, StackArtifact};
use crate::config::Config;
use crate::construct::ConstructPath;
use crate::error::{Error, Result};
use crate::graph::StackGraph;
use crate::stack::Stack;
use crate::stacks::delivery::{DeliveryStack, DeliveryStackProps};
use crate::stacks::storage::{StorageStack, StorageStackProps};
use crate::template::{Expr, Output};

/// Context key selecting the deployment environment.
pub const ENV_CONTEXT_KEY: &str = "env";

/// Construct id under which generated exports live.
const EXPORTS_ID: &str = "Exports";

/// A set of stacks synthesized together.
#[derive(Debug, Clone, Default)]
pub struct App {
    context: IndexMap<String, String>,
    stacks: IndexMap<String, Stack>,
}

impl App {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an app with initial context values.
    pub fn with_context(context: IndexMap<String, String>) -> Self {
        Self {
            context,
            stacks: IndexMap::new(),
        }
    }

    pub fn set_context(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.context.insert(key.into(), value.into());
    }

    /// Look up a context value; `None` when the key is unset.
    pub fn try_get_context(&self, key: &str) -> Option<&str> {
        self.context.get(key).map(String::as_str)
    }

    pub fn context(&self) -> &IndexMap<String, String> {
        &self.context
    }

    /// Parse a `KEY=VALUE` context argument.
    pub fn parse_context_arg(arg: &str) -> Result<(String, String)> {
        match arg.split_once('=') {
            Some((key, value)) if !key.trim().is_empty() => {
                Ok((key.trim().to_string(), value.to_string()))
            }
            _ => Err(Error::InvalidContext(arg.to_string())),
        }
    }

    /// Add a fully declared stack.
    pub fn add_stack(&mut self, stack: Stack) -> Result<()> {
        if self.stacks.contains_key(stack.name()) {
            return Err(Error::DuplicateStack(stack.name().to_string()));
        }
        debug!(stack = %stack.name(), resources = stack.resources().len(), "Added stack");
        self.stacks.insert(stack.name().to_string(), stack);
        Ok(())
    }

    pub fn stack(&self, name: &str) -> Option<&Stack> {
        self.stacks.get(name)
    }

    /// Stacks in the order they were added.
    pub fn stacks(&self) -> impl Iterator<Item = &Stack> {
        self.stacks.values()
    }

    /// Synthesize every stack into a cloud assembly.
    pub fn synth(&self) -> Result<CloudAssembly> {
        let mut stacks = self.stacks.clone();
        let mut graph = StackGraph::new();
        for name in stacks.keys() {
            graph.add_stack(name);
        }
        for stack in stacks.values() {
            for dependency in stack.dependencies() {
                graph.add_dependency(stack.name(), dependency)?;
            }
        }

        for index in 0..stacks.len() {
            resolve_stack_imports(&mut stacks, index, &mut graph)?;
        }

        for stack in stacks.values() {
            stack.validate_references()?;
        }

        let mut artifacts = Vec::with_capacity(stacks.len());
        for name in graph.deployment_order()? {
            let stack = stacks
                .get(&name)
                .ok_or_else(|| Error::StackNotFound(name.clone()))?;
            artifacts.push(StackArtifact {
                name: name.clone(),
                environment: stack.environment().clone(),
                template: stack.to_template(),
                dependencies: graph.dependencies(&name),
            });
            info!(
                stack = %name,
                resources = stack.resources().len(),
                outputs = stack.outputs().len(),
                "Synthesized stack"
            );
        }

        Ok(CloudAssembly::new(artifacts))
    }
}

/// An export the producing stack has to declare.
struct PendingExport {
    producer: String,
    output_id: String,
    output: Output,
}

/// Resolve the imported values of the stack at `index`, declaring the
/// exports they need on their producers.
fn resolve_stack_imports(
    stacks: &mut IndexMap<String, Stack>,
    index: usize,
    graph: &mut StackGraph,
) -> Result<()> {
    let Some((consumer, stack)) = stacks.get_index_mut(index) else {
        return Ok(());
    };
    let consumer = consumer.clone();
    let mut resources = std::mem::take(stack.resources_mut());
    let mut outputs = std::mem::take(stack.outputs_mut());

    let mut pending = Vec::new();
    let result = {
        let stacks = &*stacks;
        let mut resolve = |producer: &str, value: &Expr| -> Result<Expr> {
            resolve_import(stacks, &consumer, producer, value, &mut pending)
        };
        resources
            .values_mut()
            .flat_map(|r| r.properties.values_mut())
            .chain(outputs.values_mut().map(|o| &mut o.value))
            .try_for_each(|expr| expr.resolve_imports(&mut resolve))
    };

    if let Some(stack) = stacks.get_mut(&consumer) {
        *stack.resources_mut() = resources;
        *stack.outputs_mut() = outputs;
    }
    result?;

    for export in pending {
        let producer = stacks
            .get_mut(&export.producer)
            .ok_or_else(|| Error::StackNotFound(export.producer.clone()))?;
        producer.ensure_output(&export.output_id, export.output);

        graph.add_dependency(&consumer, &export.producer)?;
        if let Some(stack) = stacks.get_mut(&consumer) {
            stack.add_dependency(&export.producer);
        }
    }
    Ok(())
}

fn resolve_import(
    stacks: &IndexMap<String, Stack>,
    consumer: &str,
    producer: &str,
    value: &Expr,
    pending: &mut Vec<PendingExport>,
) -> Result<Expr> {
    if producer == consumer {
        return Ok(value.clone());
    }

    let invalid = |message: &str| Error::InvalidCrossStackReference {
        consumer: consumer.to_string(),
        producer: producer.to_string(),
        message: message.to_string(),
    };
    let producer_stack = stacks
        .get(producer)
        .ok_or_else(|| Error::StackNotFound(producer.to_string()))?;
    let consumer_stack = stacks
        .get(consumer)
        .ok_or_else(|| Error::StackNotFound(consumer.to_string()))?;
    if producer_stack.environment() != consumer_stack.environment() {
        return Err(invalid(
            "stacks in different environments cannot share exported values",
        ));
    }

    let target = value
        .target_logical_id()
        .ok_or_else(|| invalid("only Ref and Fn::GetAtt values can be exported"))?;
    if !producer_stack.has_resource(target) {
        return Err(Error::UnresolvedReference {
            stack: producer.to_string(),
            logical_id: target.to_string(),
        });
    }

    let output_id = export_output_id(value)?;
    let export_name = format!("{}:{}", producer, output_id);
    debug!(
        consumer = %consumer,
        producer = %producer,
        export = %export_name,
        "Resolved cross-stack reference"
    );
    pending.push(PendingExport {
        producer: producer.to_string(),
        output_id,
        output: Output::new(value.clone()).with_export(export_name.clone()),
    });
    Ok(Expr::ImportValue(export_name))
}

/// Output id of the export carrying `value`, e.g.
/// `ExportsOutputFnGetAttFrontendBucketA1B2C3D4ArnE5F6A7B8`.
fn export_output_id(value: &Expr) -> Result<String> {
    let token = match value {
        Expr::Ref(id) => format!("OutputRef{}", id),
        Expr::GetAtt(id, attribute) => format!("OutputFnGetAtt{}{}", id, attribute),
        _ => format!("Output{}", serde_json::to_string(value)?),
    };
    Ok(ConstructPath::root(EXPORTS_ID)?.child(&token)?.logical_id())
}

/// The stacks of one deployment.
#[derive(Debug, Clone)]
pub struct Deployment {
    /// Environment name, e.g. `dev`
    pub environment: String,
    /// Resource name prefix, e.g. `testpy-dev`
    pub prefix: String,
    pub storage: StorageStack,
    pub delivery: DeliveryStack,
}

/// Declare the storage and delivery stacks for the environment selected by
/// the `env` context value.
pub fn compose(app: &mut App, config: &Config) -> Result<Deployment> {
    let environment = app
        .try_get_context(ENV_CONTEXT_KEY)
        .filter(|env| !env.is_empty())
        .map(str::to_string)
        .unwrap_or_else(|| config.app.default_environment.clone());
    let prefix = config.prefix(&environment);
    let target = config.target_environment();
    info!(environment = %environment, prefix = %prefix, target = %target, "Composing app");

    let storage = StorageStack::new(
        app,
        &format!("{}-s3", prefix),
        target.clone(),
        StorageStackProps {
            prefix: prefix.clone(),
            private_origin: config.delivery.private_origin,
        },
    )?;

    let delivery = DeliveryStack::new(
        app,
        &format!("{}-cloudfront", prefix),
        target,
        storage.frontend_bucket(),
        DeliveryStackProps {
            price_class: config.delivery.price_class,
            origin_access_identity: config
                .delivery
                .private_origin
                .then(|| storage.oai()),
            certificate_arn: config.delivery.certificate_arn.clone(),
            domain_names: config.delivery.domain_names.clone(),
        },
    )?;

    Ok(Deployment {
        environment,
        prefix,
        storage,
        delivery,
    })
}
