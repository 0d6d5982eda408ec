
mod master;
mod pipeline;
mod worker;
