use threadpool::ThreadPool;

pub struct AsyncExecutor {
    pool: ThreadPool,
}

impl AsyncExecutor {
    pub fn new(thread_count: usize) -> AsyncExecutor {
        AsyncExecutor {
            pool: ThreadPool::new(thread_count.max(1)),
        }
    }

    pub fn queue_task<F>(&self, task: F)
    where
        F: FnOnce() + Send + 'static,
    {
        self.pool.execute(task);
    }

    pub fn join(&self) {
        self.pool.join();
    }
}
