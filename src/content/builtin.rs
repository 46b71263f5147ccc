use crate::script::{EventType, Script};

/// Lines shipped with the binary; used whenever a pack is missing or unreadable.
pub(super) fn builtin_idle() -> Vec<Script> {
    vec![
        Script::new("morning_default", "早上好，要不要先喝口水？", EventType::Idle)
            .with_time_range("05:00-11:00")
            .with_cooldown(10),
        Script::new("afternoon_default", "午后效率时间到了，继续推进吧。", EventType::Idle)
            .with_time_range("11:00-18:00")
            .with_cooldown(10),
        Script::new("night_default", "已经很晚了，注意休息。", EventType::Idle)
            .with_time_range("22:00-06:00")
            .with_priority(1)
            .with_cooldown(20),
        Script::new("fallback_default", "我在屏幕边缘看着你。", EventType::Idle)
            .with_priority(3)
            .with_cooldown(5),
    ]
}

pub(super) fn builtin_panic() -> Vec<Script> {
    vec![
        Script::new("panic_default", "哇！被发现了！", EventType::Panic)
            .with_priority(1)
            .with_probability(0.6),
        Script::new("panic_shy", "才...才没有在偷看你...", EventType::Panic)
            .with_priority(1)
            .with_probability(0.4),
    ]
}
