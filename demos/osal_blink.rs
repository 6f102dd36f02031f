//! Blink Example - OSAL tasks driven by a reload timer and messages

#![no_std]
#![no_main]

use cortex_m_rt::entry;
use cortex_m_semihosting::hprintln;
use osal::event::SYS_EVENT_MSG;
use osal::port::{SysTickClock, WfiIdle};
use osal::{Domain, EventMask, Osal, TaskDef, TaskId};

const CORE_HZ: u32 = 16_000_000;

const BLINK_EVT: EventMask = 0x0001;
const REPORT_TASK: TaskId = 1;

// ============ Tasks ============

fn blink_init(osal: &Osal<'_>, id: TaskId) {
    osal::info!("Blink task started");
    let _ = osal.start_reload_timer(id, BLINK_EVT, 500);
}

fn blink_task(osal: &Osal<'_>, _id: TaskId, events: EventMask) -> EventMask {
    if events & BLINK_EVT != 0 {
        // Tell the reporter the current uptime
        if let Some(m) = osal.msg_allocate(5) {
            let now = osal.system_clock().to_le_bytes();
            let _ = osal.msg_write(m, &[0x01, now[0], now[1], now[2], now[3]]);
            let _ = osal.msg_send(REPORT_TASK, m);
        }
        return events & !BLINK_EVT;
    }
    0
}

fn report_task(osal: &Osal<'_>, id: TaskId, events: EventMask) -> EventMask {
    if events & SYS_EVENT_MSG != 0 {
        while let Some(m) = osal.msg_receive(id) {
            let mut buf = [0u8; 5];
            if osal.msg_read(m, &mut buf).is_ok() {
                let ms = u32::from_le_bytes([buf[1], buf[2], buf[3], buf[4]]);
                hprintln!("blink at {} ms", ms);
            }
            let _ = osal.msg_deallocate(m);
        }
        return events & !SYS_EVENT_MSG;
    }
    0
}

// ============ Context ============

static TASKS: [TaskDef; 2] = [
    TaskDef::new("Blink", blink_task).with_init(blink_init),
    TaskDef::new("Report", report_task),
];

static CLOCK: SysTickClock = SysTickClock::new(CORE_HZ);
static IDLE: WfiIdle = WfiIdle;
static OSAL: Osal<'static> = Osal::new(&TASKS, &CLOCK, Domain::Standalone(&IDLE));

// ============ Main ============

#[entry]
fn main() -> ! {
    CLOCK.start();

    OSAL.init_system().expect("OSAL init failed");

    osal::info!("Starting OSAL");
    OSAL.start_system()
}
