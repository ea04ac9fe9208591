mod cli;
mod relay;
