//! # 蒙特卡洛运行参数
//!
//! 写入求解器通用配置文件 `config.dat` 的参数。
//!
//! ## 依赖关系
//! - 被 `writer/cinola.rs` 渲染
//! - 由 `commands/generate.rs` 根据命令行参数构造

/// 求解器运行参数
#[derive(Debug, Clone, PartialEq)]
pub struct SolverConfig {
    /// 作业名
    pub job_name: String,
    /// 单步最大自旋改变量
    pub max_spin_change: f64,
    /// 每个温度的蒙特卡洛步数
    pub steps_per_temperature: u64,
    /// 预弛豫步数
    pub prerelax_steps: u64,
    /// 温度扫描 (K)
    pub t_low: f64,
    pub t_high: f64,
    pub t_step: f64,
    /// 外场大小，扫描区间退化为单点
    pub field: f64,
    pub field_step: f64,
    /// 外场方向
    pub field_direction: [f64; 3],
}

impl Default for SolverConfig {
    fn default() -> Self {
        SolverConfig {
            job_name: "cinolagen".to_string(),
            max_spin_change: 0.5,
            steps_per_temperature: 10000,
            prerelax_steps: 1,
            t_low: 1.0,
            t_high: 1000.0,
            t_step: 10.0,
            field: 0.0,
            field_step: 1.0,
            field_direction: [1.0, 0.0, 0.0],
        }
    }
}

impl SolverConfig {
    pub fn with_job_name(mut self, job_name: impl Into<String>) -> Self {
        self.job_name = job_name.into();
        self
    }

    /// 检查温度区间
    pub fn validate(&self) -> std::result::Result<(), String> {
        if !(self.t_low > 0.0 && self.t_high >= self.t_low) {
            return Err(format!(
                "temperature range must satisfy 0 < T_low <= T_high (got {} - {})",
                self.t_low, self.t_high
            ));
        }
        if self.t_step <= 0.0 {
            return Err(format!("T_step must be positive (got {})", self.t_step));
        }
        if self.steps_per_temperature == 0 {
            return Err("steps per temperature must be at least 1".to_string());
        }
        Ok(())
    }
}
