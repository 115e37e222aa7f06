//! 摄像头 - 基础设施层
//!
//! 持有稀缺资源（摄像头画面流），只暴露"取一帧"的能力
//!
//! 同一客户端同一时刻只允许一个 `CameraLease` 存在；
//! lease 在任何退出路径上被 drop 时都会停止画面流并归还名额

use std::sync::Arc;
use tokio::sync::{OwnedSemaphorePermit, Semaphore};
use tracing::debug;

use crate::error::CameraError;
use crate::models::Frame;

/// 已打开的摄像头画面流
pub trait CameraStream: Send {
    fn read_frame(&mut self) -> Result<Frame, CameraError>;

    /// 停止所有画面轨道
    fn stop(&mut self);
}

/// 摄像头设备
pub trait CameraDevice: Send {
    type Stream: CameraStream;

    /// 请求权限并打开画面流
    fn open(&mut self) -> Result<Self::Stream, CameraError>;
}

/// 摄像头独占闸门
///
/// 克隆后共享同一个名额
#[derive(Debug, Clone)]
pub struct CameraGate {
    permits: Arc<Semaphore>,
}

impl CameraGate {
    pub fn new() -> Self {
        Self {
            permits: Arc::new(Semaphore::new(1)),
        }
    }

    /// 摄像头当前是否空闲
    pub fn is_free(&self) -> bool {
        self.permits.available_permits() > 0
    }

    /// 获取摄像头
    ///
    /// 名额被占用时立即返回 `CameraError::Busy`，不会排队等待
    pub fn acquire<D: CameraDevice>(
        &self,
        device: &mut D,
    ) -> Result<CameraLease<D::Stream>, CameraError> {
        let permit = self
            .permits
            .clone()
            .try_acquire_owned()
            .map_err(|_| CameraError::Busy)?;

        // open 失败时 permit 随之 drop，名额自动归还
        let stream = device.open()?;
        debug!("📷 摄像头已打开");

        Ok(CameraLease {
            stream,
            stopped: false,
            _permit: permit,
        })
    }
}

impl Default for CameraGate {
    fn default() -> Self {
        Self::new()
    }
}

/// 摄像头租约
pub struct CameraLease<S: CameraStream> {
    stream: S,
    stopped: bool,
    _permit: OwnedSemaphorePermit,
}

impl<S: CameraStream> CameraLease<S> {
    pub fn read_frame(&mut self) -> Result<Frame, CameraError> {
        self.stream.read_frame()
    }

    /// 显式释放（等价于 drop）
    pub fn release(self) {
        drop(self);
    }
}

impl<S: CameraStream> Drop for CameraLease<S> {
    fn drop(&mut self) {
        if !self.stopped {
            self.stream.stop();
            self.stopped = true;
            debug!("📷 摄像头已释放");
        }
    }
}

#[cfg(test)]
pub(crate) mod fakes {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// 记录打开/停止次数的假摄像头
    ///
    /// 帧序号从 1 开始，在多次打开之间连续计数；`fail_at` 指定的那一帧读取失败
    #[derive(Debug, Clone, Default)]
    pub struct FakeCamera {
        pub opened: Arc<AtomicUsize>,
        pub stopped: Arc<AtomicUsize>,
        pub frames: Arc<AtomicUsize>,
        pub deny: Option<CameraError>,
        pub fail_at: Option<usize>,
    }

    pub struct FakeStream {
        stopped: Arc<AtomicUsize>,
        frames: Arc<AtomicUsize>,
        fail_at: Option<usize>,
    }

    impl CameraStream for FakeStream {
        fn read_frame(&mut self) -> Result<Frame, CameraError> {
            let number = self.frames.fetch_add(1, Ordering::SeqCst) + 1;
            if self.fail_at == Some(number) {
                return Err(CameraError::FrameFailed(format!("frame {}", number)));
            }
            Ok(Frame {
                data: vec![number as u8],
                width: 1,
                height: 1,
            })
        }

        fn stop(&mut self) {
            self.stopped.fetch_add(1, Ordering::SeqCst);
        }
    }

    impl CameraDevice for FakeCamera {
        type Stream = FakeStream;

        fn open(&mut self) -> Result<FakeStream, CameraError> {
            if let Some(err) = &self.deny {
                return Err(err.clone());
            }
            self.opened.fetch_add(1, Ordering::SeqCst);
            Ok(FakeStream {
                stopped: self.stopped.clone(),
                frames: self.frames.clone(),
                fail_at: self.fail_at,
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::fakes::FakeCamera;
    use super::*;
    use std::sync::atomic::Ordering;

    #[test]
    fn second_lease_is_refused_until_first_is_dropped() {
        let gate = CameraGate::new();
        let mut camera = FakeCamera::default();

        let lease = gate.acquire(&mut camera).unwrap();
        assert!(!gate.is_free());
        assert_eq!(
            gate.acquire(&mut camera).err(),
            Some(CameraError::Busy)
        );

        drop(lease);
        assert!(gate.is_free());
        assert_eq!(camera.stopped.load(Ordering::SeqCst), 1);
        assert!(gate.acquire(&mut camera).is_ok());
    }

    #[test]
    fn failed_open_returns_the_permit() {
        let gate = CameraGate::new();
        let mut camera = FakeCamera {
            deny: Some(CameraError::PermissionDenied),
            ..Default::default()
        };

        assert_eq!(
            gate.acquire(&mut camera).err(),
            Some(CameraError::PermissionDenied)
        );
        assert!(gate.is_free());
    }

    #[test]
    fn lease_reads_frames_and_stops_once() {
        let gate = CameraGate::new();
        let mut camera = FakeCamera::default();

        let mut lease = gate.acquire(&mut camera).unwrap();
        assert_eq!(lease.read_frame().unwrap().data, vec![1]);
        assert_eq!(lease.read_frame().unwrap().data, vec![2]);
        lease.release();

        assert_eq!(camera.opened.load(Ordering::SeqCst), 1);
        assert_eq!(camera.stopped.load(Ordering::SeqCst), 1);
    }
}
