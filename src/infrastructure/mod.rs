//! 基础设施层：持有本次运行的稀缺资源，只暴露能力

pub mod output_file;

pub use output_file::OutputFile;
