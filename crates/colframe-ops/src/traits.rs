//! Operator trait shared by the engines.
//!
//! Every engine runs in two phases. `plan` checks the request against the
//! input frame (column existence, type compatibility, pattern syntax) and
//! resolves everything needed to run, without touching rows. `execute` then
//! does the row work. `apply` chains the two, so a caller either gets a
//! complete frame or an error raised before any row was scanned.

use colframe_core::prelude::{Frame, Result};

use crate::trace;

pub trait Operator {
    /// Validated, resolved form of the request for one input frame.
    type Plan;

    /// Human-readable operator name (stable).
    fn name(&self) -> &'static str;

    /// Validate against `input` and resolve columns/types. No row work.
    fn plan(&self, input: &Frame) -> Result<Self::Plan>;

    /// Row work for an already validated plan.
    fn execute(&self, plan: Self::Plan, input: &Frame) -> Result<Frame>;

    fn apply(&self, input: &Frame) -> Result<Frame> {
        let plan = self.plan(input)?;
        let output = self.execute(plan, input)?;
        trace::record(self.name(), input.len(), output.len());
        Ok(output)
    }
}
