/// Decide and evolve in one step: run `handle`, then `apply` each resulting
/// event to the same instance. No persistence and no publication, which
/// makes it the helper of choice for aggregate unit tests.
pub fn execute<A>(aggregate: &mut A, command: &A::Command) -> Result<Vec<A::Event>, A::Error>
where
    A: tms_core::Aggregate,
{
    let events = A::handle(aggregate, command)?;
    for ev in &events {
        A::apply(aggregate, ev);
    }
    Ok(events)
}
