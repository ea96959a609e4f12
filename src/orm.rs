// The mapping layer: schema descriptors, generated statements and the
// database handle that executes them.
pub mod database;
pub mod descriptor;
pub mod record;
pub mod statements;
