//! Invocation planning for one scheduling tick.

/// Split a per-tick admission rate into bounded processor invocations.
///
/// Returns the `iterations` argument for each invocation: the rate is
/// first converted to drain cycles (`ceil(rate / batch_size)`), then
/// chunked by the per-invocation ceiling.
pub fn plan_invocations(rate: u32, batch_size: u32, max_iterations_per_call: u32) -> Vec<u32> {
    let batch_size = batch_size.max(1);
    let per_call = max_iterations_per_call.max(1);
    let mut remaining = rate.div_ceil(batch_size);

    let mut invocations = Vec::new();
    while remaining > 0 {
        let iterations = remaining.min(per_call);
        invocations.push(iterations);
        remaining -= iterations;
    }
    invocations
}
