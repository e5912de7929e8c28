//! Call envelopes and call chains.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::actor::ActorReference;
use crate::error::ActorError;

/// One invocation of a method on an actor.
///
/// Arguments are JSON values; actor references travel in their
/// [`ActorReference::to_value`] form.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Call {
    /// Actor that issued the call, `None` for external callers.
    pub caller: Option<ActorReference>,
    /// Actor that runs the call.
    pub target: ActorReference,
    /// Method name.
    pub method: String,
    /// Positional arguments.
    pub args: Vec<Value>,
}

impl Call {
    /// External call of `method` on `target` without arguments.
    pub fn new(target: ActorReference, method: impl Into<String>) -> Self {
        Self {
            caller: None,
            target,
            method: method.into(),
            args: Vec::new(),
        }
    }

    /// Attribute the call to `caller`.
    pub fn with_caller(mut self, caller: ActorReference) -> Self {
        self.caller = Some(caller);
        self
    }

    /// Append one argument.
    pub fn with_arg(mut self, arg: impl Into<Value>) -> Self {
        self.args.push(arg.into());
        self
    }

    /// Replace the argument list.
    pub fn with_args(mut self, args: Vec<Value>) -> Self {
        self.args = args;
        self
    }
}

/// Decode the actor reference passed at `index`.
pub fn reference_arg(method: &str, args: &[Value], index: usize) -> Result<ActorReference, ActorError> {
    let value = args.get(index).ok_or_else(|| ActorError::InvalidArgument {
        method: method.to_string(),
        index,
        reason: "missing".to_string(),
    })?;

    ActorReference::from_value(value).map_err(|e| ActorError::InvalidArgument {
        method: method.to_string(),
        index,
        reason: e.to_string(),
    })
}

/// Actors whose turns are held by the frames of a synchronous call chain,
/// outermost first.
///
/// A chain starts empty at an external caller (or a one-way post) and grows
/// by one reference each time a turn issues an awaited call.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CallChain(Vec<ActorReference>);

impl CallChain {
    /// Chain of a call with no ancestors.
    pub fn root() -> Self {
        Self::default()
    }

    /// Whether `reference` holds a turn somewhere up the chain.
    pub fn contains(&self, reference: &ActorReference) -> bool {
        self.0.contains(reference)
    }

    /// This chain with `reference` appended as the innermost frame.
    pub fn extended(&self, reference: &ActorReference) -> Self {
        let mut frames = self.0.clone();
        frames.push(reference.clone());
        Self(frames)
    }

    /// Number of frames.
    pub fn depth(&self) -> usize {
        self.0.len()
    }

    /// Frames, outermost first.
    pub fn frames(&self) -> &[ActorReference] {
        &self.0
    }

    /// Consume the chain into its frames.
    pub fn into_frames(self) -> Vec<ActorReference> {
        self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::actor::ActorType;
    use serde_json::json;

    const TEST: ActorType = ActorType::from_static("Test");
    const TEST2: ActorType = ActorType::from_static("Test2");

    #[test]
    fn test_chain_membership() {
        let t = ActorReference::random(TEST);
        let u = ActorReference::random(TEST2);

        let root = CallChain::root();
        assert!(!root.contains(&t));

        let chain = root.extended(&t).extended(&u);
        assert!(chain.contains(&t));
        assert!(chain.contains(&u));
        assert_eq!(chain.depth(), 2);
        assert_eq!(chain.frames(), &[t.clone(), u.clone()]);

        // Extending does not touch the parent chain
        assert_eq!(root.depth(), 0);
    }

    #[test]
    fn test_reference_arg_decoding() {
        let u = ActorReference::random(TEST2);
        let call = Call::new(ActorReference::random(TEST), "CallMeBack").with_arg(u.clone());

        assert_eq!(reference_arg(&call.method, &call.args, 0).unwrap(), u);

        match reference_arg(&call.method, &call.args, 1) {
            Err(ActorError::InvalidArgument { index, reason, .. }) => {
                assert_eq!(index, 1);
                assert_eq!(reason, "missing");
            }
            other => panic!("expected InvalidArgument, got {other:?}"),
        }

        let bad = vec![json!(42)];
        assert!(matches!(
            reference_arg("CallMeBack", &bad, 0),
            Err(ActorError::InvalidArgument { index: 0, .. })
        ));
    }
}
