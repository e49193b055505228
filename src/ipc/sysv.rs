//! System V transport
//!
//! Kernel message queues through `msgget`/`msgsnd`/`msgrcv`/`msgctl`.
//!
//! The queue id is looked up by key on every call, so a queue removed by
//! another process is transparently re-created on next use.
//!
//! `msgrcv` has no timeout, so a bounded receive polls with `IPC_NOWAIT`
//! on a short step until the deadline instead of relying on an alarm
//! signal to interrupt a blocking call.
//!
//! Receives pass `MSG_NOERROR`: a message longer than the buffer is cut to
//! fit and taken off the queue, where it fails frame decoding, instead of
//! staying at the head and failing every later receive with `E2BIG`.

use std::io;
use std::mem;
use std::thread;
use std::time::{Duration, Instant};

use crate::error::{GpioError, Result};
use crate::protocol::MAX_MESSAGE_SIZE;

use super::{Message, MessageTag, QueueKey, TagFilter, Transport, Wait};

/// Sleep between non-blocking receive attempts
const POLL_STEP: Duration = Duration::from_millis(5);

/// Permissions of queues this transport creates
const QUEUE_MODE: libc::c_int = 0o666;

/// `struct msgbuf`: a `long` type followed by the message text
///
/// Backed by `c_long` words so the type field is naturally aligned.
struct MsgBuf {
    words: Vec<libc::c_long>,
}

impl MsgBuf {
    const WORD: usize = mem::size_of::<libc::c_long>();

    fn with_capacity(text_len: usize) -> Self {
        let text_words = text_len.div_ceil(Self::WORD);
        Self {
            words: vec![0; 1 + text_words],
        }
    }

    fn text_capacity(&self) -> usize {
        (self.words.len() - 1) * Self::WORD
    }

    fn tag(&self) -> libc::c_long {
        self.words[0]
    }

    fn set_tag(&mut self, tag: libc::c_long) {
        self.words[0] = tag;
    }

    fn text_mut(&mut self) -> &mut [u8] {
        let len = self.text_capacity();
        // SAFETY: words[1..] is an initialized, contiguous region of exactly
        // `len` bytes, and u8 has no alignment or validity requirements.
        unsafe { std::slice::from_raw_parts_mut(self.words[1..].as_mut_ptr().cast::<u8>(), len) }
    }

    fn as_ptr(&self) -> *const libc::c_void {
        self.words.as_ptr().cast()
    }

    fn as_mut_ptr(&mut self) -> *mut libc::c_void {
        self.words.as_mut_ptr().cast()
    }
}

fn errno() -> i32 {
    io::Error::last_os_error()
        .raw_os_error()
        .unwrap_or(crate::error::ERROR_SENTINEL)
}

/// Transport over kernel System V message queues
#[derive(Debug, Clone)]
pub struct SysVTransport {
    max_payload: usize,
}

impl SysVTransport {
    pub fn new() -> Self {
        Self::with_max_payload(MAX_MESSAGE_SIZE)
    }

    pub fn with_max_payload(max_payload: usize) -> Self {
        Self { max_payload }
    }

    /// Look up the queue id for `key`, optionally creating the queue
    fn open(&self, key: QueueKey, create: bool) -> Result<Option<libc::c_int>> {
        let flags = if create { libc::IPC_CREAT | QUEUE_MODE } else { 0 };

        // SAFETY: msgget takes plain integers and touches no memory of ours.
        let id = unsafe { libc::msgget(key as libc::key_t, flags) };
        if id >= 0 {
            return Ok(Some(id));
        }

        match errno() {
            libc::ENOENT if !create => Ok(None),
            errno => Err(GpioError::Transport {
                op: "msgget",
                key,
                errno,
            }),
        }
    }

    fn try_receive(
        &self,
        key: QueueKey,
        id: libc::c_int,
        filter: TagFilter,
        buf: &mut MsgBuf,
    ) -> Result<Option<Message>> {
        let msgtyp: libc::c_long = match filter {
            TagFilter::Any => 0,
            TagFilter::Exact(tag) => to_c_long(key, "msgrcv", tag)?,
        };
        let capacity = buf.text_capacity();

        loop {
            // SAFETY: buf holds one c_long followed by `capacity` writable
            // bytes, which is the layout msgrcv expects for msgsz = capacity.
            let received = unsafe {
                libc::msgrcv(
                    id,
                    buf.as_mut_ptr(),
                    capacity,
                    msgtyp,
                    libc::IPC_NOWAIT | libc::MSG_NOERROR,
                )
            };

            if received >= 0 {
                let len = received as usize;
                return Ok(Some(Message {
                    tag: i64::from(buf.tag()),
                    payload: buf.text_mut()[..len].to_vec(),
                }));
            }

            match errno() {
                libc::ENOMSG => return Ok(None),
                libc::EINTR => continue,
                errno => {
                    return Err(GpioError::Transport {
                        op: "msgrcv",
                        key,
                        errno,
                    })
                }
            }
        }
    }
}

impl Default for SysVTransport {
    fn default() -> Self {
        Self::new()
    }
}

fn to_c_long(key: QueueKey, op: &'static str, tag: MessageTag) -> Result<libc::c_long> {
    match libc::c_long::try_from(tag) {
        Ok(tag) if tag >= 1 => Ok(tag),
        _ => Err(GpioError::Transport {
            op,
            key,
            errno: libc::EINVAL,
        }),
    }
}

impl Transport for SysVTransport {
    fn name(&self) -> &'static str {
        "sysv"
    }

    fn max_payload(&self) -> usize {
        self.max_payload
    }

    fn send(&self, key: QueueKey, tag: MessageTag, payload: &[u8]) -> Result<()> {
        if payload.len() > self.max_payload {
            return Err(GpioError::MessageTooLarge {
                size: payload.len(),
                max: self.max_payload,
            });
        }
        let mtype = to_c_long(key, "msgsnd", tag)?;

        let mut buf = MsgBuf::with_capacity(payload.len());
        buf.set_tag(mtype);
        buf.text_mut()[..payload.len()].copy_from_slice(payload);

        loop {
            let id = self
                .open(key, true)?
                .ok_or(GpioError::Transport {
                    op: "msgget",
                    key,
                    errno: libc::ENOENT,
                })?;

            // SAFETY: buf holds the type word followed by at least
            // payload.len() initialized bytes.
            let rc = unsafe { libc::msgsnd(id, buf.as_ptr(), payload.len(), 0) };
            if rc == 0 {
                return Ok(());
            }

            match errno() {
                // Interrupted, or the queue vanished under us: look it up again
                libc::EINTR | libc::EIDRM => continue,
                errno => {
                    return Err(GpioError::Transport {
                        op: "msgsnd",
                        key,
                        errno,
                    })
                }
            }
        }
    }

    fn receive(&self, key: QueueKey, filter: TagFilter, wait: Wait) -> Result<Option<Message>> {
        let deadline = match wait {
            Wait::NoWait => None,
            Wait::Timeout(d) => Some(Instant::now() + d),
        };
        let mut buf = MsgBuf::with_capacity(self.max_payload);

        loop {
            let id = self
                .open(key, true)?
                .ok_or(GpioError::Transport {
                    op: "msgget",
                    key,
                    errno: libc::ENOENT,
                })?;

            if let Some(message) = self.try_receive(key, id, filter, &mut buf)? {
                return Ok(Some(message));
            }

            let Some(deadline) = deadline else {
                return Ok(None);
            };
            let now = Instant::now();
            if now >= deadline {
                return Ok(None);
            }
            thread::sleep(POLL_STEP.min(deadline - now));
        }
    }

    fn pending(&self, key: QueueKey) -> Result<usize> {
        let Some(id) = self.open(key, false)? else {
            return Ok(0);
        };

        // SAFETY: msqid_ds is a plain C struct; all-zero is a valid value
        // and msgctl(IPC_STAT) overwrites it.
        let mut ds: libc::msqid_ds = unsafe { mem::zeroed() };
        // SAFETY: ds is a valid, writable msqid_ds.
        let rc = unsafe { libc::msgctl(id, libc::IPC_STAT, &mut ds) };
        if rc != 0 {
            return match errno() {
                libc::EINVAL | libc::EIDRM => Ok(0),
                errno => Err(GpioError::Transport {
                    op: "msgctl(IPC_STAT)",
                    key,
                    errno,
                }),
            };
        }
        Ok(ds.msg_qnum as usize)
    }

    fn exists(&self, key: QueueKey) -> Result<bool> {
        Ok(self.open(key, false)?.is_some())
    }

    fn remove(&self, key: QueueKey) -> Result<()> {
        let Some(id) = self.open(key, false)? else {
            return Ok(());
        };

        // SAFETY: IPC_RMID ignores the buffer argument.
        let rc = unsafe { libc::msgctl(id, libc::IPC_RMID, std::ptr::null_mut()) };
        if rc != 0 {
            return match errno() {
                // Already removed by someone else
                libc::EINVAL | libc::EIDRM => Ok(()),
                errno => Err(GpioError::Transport {
                    op: "msgctl(IPC_RMID)",
                    key,
                    errno,
                }),
            };
        }
        Ok(())
    }
}
